//! Application configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use liftsync_auth::{AuthConfig, VaultConfig};
use liftsync_common::{Error, Result, UserId};
use liftsync_storage::DriveConfig;
use liftsync_sync::SyncConfig;

/// Top-level configuration, stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Account whose credentials and backups are used.
    pub user_id: String,
    pub database_path: PathBuf,
    /// Idle time after which an open session is ended automatically.
    pub inactivity_minutes: i64,
    pub inactivity_poll_secs: u64,
    pub auth: AuthConfig,
    pub vault: VaultConfig,
    pub drive: DriveConfig,
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            database_path: Self::default_database_path(),
            inactivity_minutes: 30,
            inactivity_poll_secs: 60,
            auth: AuthConfig::default(),
            vault: VaultConfig::default(),
            drive: DriveConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file yields the defaults; a malformed or invalid one is an
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Serialization(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the timers and sync coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.inactivity_poll_secs == 0 {
            return Err(Error::InvalidInput(
                "inactivity_poll_secs must be at least 1".to_string(),
            ));
        }
        if self.inactivity_minutes <= 0 {
            return Err(Error::InvalidInput(
                "inactivity_minutes must be positive".to_string(),
            ));
        }
        self.sync.validate()
    }

    /// Write configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/liftsync/config.json` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftsync")
            .join("config.json")
    }

    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("liftsync")
            .join("liftsync.db")
    }

    pub fn user_id(&self) -> Result<UserId> {
        UserId::new(self.user_id.clone())
    }

    pub fn inactivity_window(&self) -> Duration {
        Duration::minutes(self.inactivity_minutes)
    }

    pub fn inactivity_poll(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inactivity_poll_secs)
    }
}
