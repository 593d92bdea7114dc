//! Local JSON persistence for the dashboard state.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::state::DashboardState;

/// File name of the persisted state. The version suffix changes whenever
/// the stored shape changes incompatibly.
pub const STATE_FILE_NAME: &str = "dashboard_state_v4.json";

/// Directory under the home directory holding config and state.
pub const APP_DIR_NAME: &str = ".plantboard";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.plantboard/dashboard_state_v4.json`
    pub fn default_location() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
        Ok(Self::new(home.join(APP_DIR_NAME).join(STATE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored state. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<DashboardState>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| StorageError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let state = DashboardState::from_json(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(state))
    }

    /// Write the state as pretty JSON, replacing the file atomically.
    pub fn save(&self, state: &DashboardState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                    path: parent.to_path_buf(),
                    message: format!("Failed to create state dir: {}", e),
                })?;
            }
        }

        let payload = serde_json::to_string_pretty(state)
            .map_err(|e| StorageError::Corrupt(format!("Serialize error: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, payload).map_err(|e| StorageError::Io {
            path: temp_path.clone(),
            message: format!("Failed to write temp file: {}", e),
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| StorageError::Io {
            path: self.path.clone(),
            message: format!("Failed to replace: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("state.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested").join("state.json"));
        let mut state = DashboardState::seeded();
        state.announcement = "Turno B: limpieza general".into();

        storage.save(&state).unwrap();
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let err = LocalStorage::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[test]
    fn test_non_object_root_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        for body in ["[]", "[1, 2]", "\"texto\"", "0"] {
            fs::write(&path, body).unwrap();
            let err = LocalStorage::new(&path).load().unwrap_err();
            assert!(matches!(err, StorageError::Corrupt(_)), "{} should be rejected", body);
        }
    }
}
