//! Application configuration.
//!
//! Loaded in tiers: embedded defaults, then an optional `taskdeck.yaml` in
//! the data directory, then environment variables. Later tiers win.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Path to the local store database file.
    pub db_path: PathBuf,
    /// Base URL of the remote backend (remote kind only).
    pub api_base_url: String,
    /// Optional bearer token for the remote backend.
    pub api_token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Local,
            db_path: default_data_dir().join("taskdeck.db"),
            api_base_url: "http://localhost:3000/api".to_string(),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
}

/// Data directory for the local database and config file.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskdeck")
}

impl AppConfig {
    /// Load configuration from the default location with env overrides.
    pub fn load() -> Self {
        Self::load_from(&default_data_dir().join("taskdeck.yaml"))
    }

    /// Load configuration from an explicit file path with env overrides.
    /// A missing or unreadable file falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::read_file(path).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    fn read_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(path).ok()?;
        match serde_yaml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(kind) = std::env::var("TASKDECK_STORAGE") {
            match kind.to_lowercase().as_str() {
                "local" => self.storage.kind = StorageKind::Local,
                "remote" => self.storage.kind = StorageKind::Remote,
                other => warn!("unknown TASKDECK_STORAGE value: {}", other),
            }
        }
        if let Ok(db_path) = std::env::var("TASKDECK_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(url) = std::env::var("TASKDECK_API_URL") {
            self.storage.api_base_url = url;
        }
        if let Ok(token) = std::env::var("TASKDECK_API_TOKEN") {
            self.storage.api_token = Some(token);
        }
    }
}
