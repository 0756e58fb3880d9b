//! Engine settings for taskvault
//!
//! Manages retention windows, object-store placement and default page sizes
//! for the backup manager and the transaction logger.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::VaultError;
use crate::storage::file_io::write_json_atomic;

/// Backup manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Hours a backup is kept before `cleanup_expired` removes it
    #[serde(default = "default_backup_retention_hours")]
    pub retention_hours: u32,

    /// Object-store folder that holds the compressed snapshots
    #[serde(default = "default_backup_folder")]
    pub folder: String,

    /// Bucket (or container) inside the object store
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Default page size for `list_backups`
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

/// Transaction logger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLogSettings {
    /// Hours a log entry is kept before `cleanup` purges it
    #[serde(default = "default_log_retention_hours")]
    pub retention_hours: u32,

    /// Default page size for `get_log_since`
    #[serde(default = "default_query_limit")]
    pub query_limit: u32,
}

fn default_backup_retention_hours() -> u32 {
    24
}

fn default_backup_folder() -> String {
    "database-backups".to_string()
}

fn default_bucket() -> String {
    "taskvault-backups".to_string()
}

fn default_list_limit() -> u32 {
    20
}

fn default_log_retention_hours() -> u32 {
    72
}

fn default_query_limit() -> u32 {
    100
}

fn default_schema_version() -> u32 {
    1
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            retention_hours: default_backup_retention_hours(),
            folder: default_backup_folder(),
            bucket: default_bucket(),
            list_limit: default_list_limit(),
        }
    }
}

impl BackupSettings {
    /// Retention window as a duration
    pub fn retention(&self) -> Duration {
        Duration::hours(i64::from(self.retention_hours))
    }
}

impl Default for TransactionLogSettings {
    fn default() -> Self {
        Self {
            retention_hours: default_log_retention_hours(),
            query_limit: default_query_limit(),
        }
    }
}

impl TransactionLogSettings {
    /// Retention window as a duration
    pub fn retention(&self) -> Duration {
        Duration::hours(i64::from(self.retention_hours))
    }
}

/// Settings for taskvault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub transaction_log: TransactionLogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
            transaction_log: TransactionLogSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        let settings = if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

            serde_json::from_str::<Settings>(&contents).map_err(|e| {
                VaultError::Config(format!("Failed to parse settings file: {}", e))
            })?
        } else {
            // Don't save yet - let caller decide when to persist
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Reject settings the engine cannot operate with
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.backup.retention_hours == 0 {
            return Err(VaultError::Config(
                "backup.retention_hours must be greater than zero".into(),
            ));
        }
        if self.transaction_log.retention_hours == 0 {
            return Err(VaultError::Config(
                "transaction_log.retention_hours must be greater than zero".into(),
            ));
        }
        if self.backup.folder.trim().is_empty() {
            return Err(VaultError::Config("backup.folder must not be empty".into()));
        }
        if self.backup.bucket.trim().is_empty() {
            return Err(VaultError::Config("backup.bucket must not be empty".into()));
        }
        Ok(())
    }
}
