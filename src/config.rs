//! User configuration (`~/.plantboard/config.json`) with environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::report::DEFAULT_MODEL;
use crate::simulation::SimulationConfig;
use crate::storage::{LocalStorage, APP_DIR_NAME};

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_FIREBASE_URL: &str = "PLANTBOARD_FIREBASE_URL";
pub const ENV_FIREBASE_AUTH: &str = "PLANTBOARD_FIREBASE_AUTH";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_STATE_PATH: &str = "PLANTBOARD_STATE_PATH";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_sync_poll_secs() -> u64 {
    5
}

fn default_simulation_slow_secs() -> u64 {
    30
}

fn default_simulation_fast_secs() -> u64 {
    15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Realtime Database root URL. Sync is off when unset.
    #[serde(default)]
    pub firebase_url: Option<String>,
    #[serde(default)]
    pub firebase_auth: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub gemini_model: String,
    /// Overrides `~/.plantboard/dashboard_state_v4.json`.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
    #[serde(default = "default_sync_poll_secs")]
    pub sync_poll_secs: u64,
    #[serde(default = "default_simulation_slow_secs")]
    pub simulation_slow_secs: u64,
    #[serde(default = "default_simulation_fast_secs")]
    pub simulation_fast_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firebase_url: None,
            firebase_auth: None,
            gemini_api_key: None,
            gemini_model: default_model(),
            state_path: None,
            sync_poll_secs: default_sync_poll_secs(),
            simulation_slow_secs: default_simulation_slow_secs(),
            simulation_fast_secs: default_simulation_fast_secs(),
        }
    }
}

impl Config {
    /// Apply overrides from `lookup` (the process environment in production).
    /// Blank values are ignored. `GEMINI_API_KEY` wins over `API_KEY`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_FIREBASE_URL) {
            self.firebase_url = Some(url);
        }
        if let Some(auth) = get(ENV_FIREBASE_AUTH) {
            self.firebase_auth = Some(auth);
        }
        if let Some(key) = get(ENV_GEMINI_API_KEY).or_else(|| get(ENV_API_KEY)) {
            self.gemini_api_key = Some(key);
        }
        if let Some(path) = get(ENV_STATE_PATH) {
            self.state_path = Some(PathBuf::from(path));
        }
    }

    pub fn storage(&self) -> Result<LocalStorage, ConfigError> {
        match &self.state_path {
            Some(path) => Ok(LocalStorage::new(path)),
            None => LocalStorage::default_location().map_err(|_| ConfigError::NoHomeDir),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.firebase_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn sync_poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync_poll_secs.max(1))
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            slow_interval: Duration::from_secs(self.simulation_slow_secs.max(1)),
            fast_interval: Duration::from_secs(self.simulation_fast_secs.max(1)),
        }
    }
}

/// `~/.plantboard/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Read a config file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}; using defaults", path.display());
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

/// Load `path` (or the default location) and apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config_from(&config_path()?)?,
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}
