//! Application configuration.
//!
//! A small JSON config file in the data directory, with serde defaults so a
//! missing file or missing fields always yield a runnable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::directory::DEFAULT_MIRRORS;

/// Default data directory: `~/.rhythmee`.
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rhythmee")
}

/// Default scheduler cadence in seconds.
fn default_tick_secs() -> u64 {
    30
}

/// Default radio-directory mirror pool.
fn default_mirrors() -> Vec<String> {
    DEFAULT_MIRRORS.iter().map(|m| (*m).to_string()).collect()
}

/// Name of the config file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Name of the key-value storage file inside the data directory.
pub const STORAGE_FILE_NAME: &str = "storage.json";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding storage and config files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Scheduler evaluation cadence in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Radio-directory mirror pool.
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_secs: default_tick_secs(),
            mirrors: default_mirrors(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the default data directory.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(default_data_dir())
    }

    /// Loads the configuration from `data_dir`, falling back to defaults
    /// when the file is missing or unreadable.
    #[must_use]
    pub fn load_from(data_dir: PathBuf) -> Self {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<AppConfig>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        // The directory the file came from wins over whatever it says.
        config.data_dir = data_dir;
        config
    }

    /// Path of the key-value storage file.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tick_secs, 30);
        assert_eq!(config.mirrors.len(), DEFAULT_MIRRORS.len());
        assert!(config.data_dir.ends_with(".rhythmee"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().to_path_buf());
        assert_eq!(config.tick_secs, 30);
        assert_eq!(config.data_dir, dir.path());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"tick_secs": 10}"#).unwrap();

        let config = AppConfig::load_from(dir.path().to_path_buf());
        assert_eq!(config.tick_secs, 10);
        assert_eq!(config.mirrors.len(), DEFAULT_MIRRORS.len());
    }

    #[test]
    fn test_load_corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{{nope").unwrap();

        let config = AppConfig::load_from(dir.path().to_path_buf());
        assert_eq!(config.tick_secs, 30);
    }

    #[test]
    fn test_storage_path() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/rhythmee-test"),
            ..AppConfig::default()
        };
        assert_eq!(
            config.storage_path(),
            PathBuf::from("/tmp/rhythmee-test/storage.json")
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
