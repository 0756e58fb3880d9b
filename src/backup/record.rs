//! Backup metadata records
//!
//! One [`BackupRecord`] exists per backup attempt. It is created
//! `in_progress` and moves exactly once to `completed` or `failed`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::models::{BackupId, BackupRecordId};

/// What triggered a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    #[default]
    Scheduled,
    Manual,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Scheduled => "scheduled",
            BackupType::Manual => "manual",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(BackupType::Scheduled),
            "manual" => Ok(BackupType::Manual),
            _ => Err(VaultError::Validation(format!("Invalid backup type: {}", s))),
        }
    }
}

/// Lifecycle state of a backup; `Completed` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    InProgress,
    Completed,
    Failed,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::InProgress => "in_progress",
            BackupStatus::Completed => "completed",
            BackupStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BackupStatus::InProgress)
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupStatus {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(BackupStatus::InProgress),
            "completed" => Ok(BackupStatus::Completed),
            "failed" => Ok(BackupStatus::Failed),
            _ => Err(VaultError::Validation(format!("Invalid backup status: {}", s))),
        }
    }
}

/// One row of the `backup_metadata` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Internal primary key
    pub id: BackupRecordId,
    /// Public, timestamp-derived id; also the object-store path stem
    pub backup_id: BackupId,
    pub backup_type: BackupType,
    pub storage_path: String,
    pub status: BackupStatus,
    /// Compressed size, set on completion
    pub size_bytes: Option<u64>,
    /// Rows exported per table name
    pub record_counts: BTreeMap<String, u64>,
    pub expires_at: DateTime<Utc>,
    /// Set only when the backup failed
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BackupRecord {
    /// A fresh `in_progress` record
    pub fn start(
        backup_type: BackupType,
        folder: &str,
        created_at: DateTime<Utc>,
        retention: chrono::Duration,
    ) -> Self {
        let created_at = created_at.trunc_subsecs(6);
        let backup_id = BackupId::for_time(created_at);
        Self {
            id: BackupRecordId::generate(),
            storage_path: storage_path(folder, &backup_id),
            backup_id,
            backup_type,
            status: BackupStatus::InProgress,
            size_bytes: None,
            record_counts: BTreeMap::new(),
            expires_at: created_at + retention,
            error_message: None,
            created_at,
        }
    }

    /// Strictly past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn total_records(&self) -> u64 {
        self.record_counts.values().sum()
    }
}

/// Object-store key for a backup: `<folder>/<backupId>.json.gz`
pub fn storage_path(folder: &str, backup_id: &BackupId) -> String {
    format!("{}/{}.json.gz", folder.trim_end_matches('/'), backup_id)
}

/// Options for listing backups
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Falls back to the configured list limit
    pub limit: Option<u32>,
    pub status: Option<BackupStatus>,
}

/// One page of backups, newest first, plus the unpaged count
#[derive(Debug, Clone)]
pub struct BackupPage {
    pub backups: Vec<BackupRecord>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Timelike};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_start_record() {
        let record = BackupRecord::start(BackupType::Manual, "database-backups", at(8), Duration::hours(24));

        assert_eq!(record.status, BackupStatus::InProgress);
        assert_eq!(record.backup_id.as_str(), "backup-2026-10-16_08-00-00-000");
        assert_eq!(
            record.storage_path,
            "database-backups/backup-2026-10-16_08-00-00-000.json.gz"
        );
        assert_eq!(record.expires_at, at(8) + Duration::hours(24));
        assert!(record.error_message.is_none());
    }

    #[test]
    fn test_start_truncates_to_microseconds() {
        let created = at(8) + Duration::nanoseconds(123_456_789);
        let record = BackupRecord::start(BackupType::Manual, "b", created, Duration::hours(24));
        assert_eq!(record.created_at.nanosecond(), 123_456_000);
        assert_eq!(record.expires_at, record.created_at + Duration::hours(24));
        assert_eq!(record.backup_id.as_str(), "backup-2026-10-16_08-00-00-123");
    }

    #[test]
    fn test_expiry_is_strict() {
        let record = BackupRecord::start(BackupType::Scheduled, "b", at(0), Duration::hours(1));
        assert!(!record.is_expired_at(at(1)));
        assert!(record.is_expired_at(at(2)));
    }

    #[test]
    fn test_status_strings() {
        for status in [
            BackupStatus::InProgress,
            BackupStatus::Completed,
            BackupStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<BackupStatus>().unwrap(), status);
        }
        assert!(BackupStatus::Completed.is_terminal());
        assert!(!BackupStatus::InProgress.is_terminal());
        assert_eq!(
            serde_json::to_string(&BackupStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_backup_type_parse() {
        assert_eq!("manual".parse::<BackupType>().unwrap(), BackupType::Manual);
        assert!("hourly".parse::<BackupType>().is_err());
    }

    #[test]
    fn test_trailing_slash_in_folder() {
        let id = BackupId::from_string("backup-x");
        assert_eq!(storage_path("dumps/", &id), "dumps/backup-x.json.gz");
    }
}
