//! Error types for the dashboard core.
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues talking to the sync store or the text generator
//! - NonRetryable: corrupt stored state, bad indexes
//! - RequiresUserAction: unreadable workbook, missing API key

use std::path::PathBuf;

use thiserror::Error;

/// Workbook ingestion failures. Only document-level problems are errors;
/// bad cells, empty sheets and unmatched rows degrade silently.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Workbook could not be read: {0}")]
    Unreadable(String),

    #[error("IO error reading {path}: {message}")]
    Io { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("{collection} index {index} out of range (len {len})")]
    IndexOutOfRange {
        collection: &'static str,
        index: usize,
        len: usize,
    },

    #[error("No bonus objective matches '{0}'")]
    NoMatchingObjective(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("IO error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Stored state is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote store request failed: {0}")]
    Request(String),

    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Remote payload could not be decoded: {0}")]
    Decode(String),

    #[error("Invalid remote store URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No API key configured for the text generator")]
    NoApiKey,

    #[error("Text generation request failed: {0}")]
    Request(String),

    #[error("Text generator returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Text generator returned no text")]
    EmptyResponse,

    #[error("Failed to serialize crew data: {0}")]
    Serialize(String),
}

impl ReportError {
    /// Text shown to the operator in place of the report.
    pub fn user_message(&self) -> &'static str {
        "Error al conectar con Gemini. Verifique su API Key."
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to write template archive: {0}")]
    Zip(String),

    #[error("Failed to write template XML: {0}")]
    Xml(String),

    #[error("IO error writing {path}: {message}")]
    Io { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("Failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Any failure surfaced to the operator.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DashboardError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DashboardError::Sync(SyncError::Request(_))
                | DashboardError::Sync(SyncError::Status { .. })
                | DashboardError::Report(ReportError::Request(_))
                | DashboardError::Report(ReportError::Status { .. })
        )
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            DashboardError::Ingest(_)
                | DashboardError::Report(ReportError::NoApiKey)
                | DashboardError::Config(_)
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DashboardError::Ingest(_) => "Error al leer el archivo. Verifica el formato.",
            DashboardError::State(_) => "Refresh the dashboard and try the edit again.",
            DashboardError::Storage(StorageError::Corrupt(_)) => {
                "Delete ~/.plantboard/dashboard_state_v4.json to reset to demo data."
            }
            DashboardError::Storage(_) => "Check file permissions and disk space.",
            DashboardError::Sync(_) => "Check your internet connection; changes stay local.",
            DashboardError::Report(e) => e.user_message(),
            DashboardError::Template(_) => "Check the output path is writable.",
            DashboardError::Config(_) => "Check your configuration in ~/.plantboard/config.json",
        }
    }
}

/// Serializable error representation for front ends.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&DashboardError> for ErrorPayload {
    fn from(err: &DashboardError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        ErrorPayload {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
