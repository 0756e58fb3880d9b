//! Strongly-typed ID wrappers for backups and log entries
//!
//! Using newtype wrappers prevents accidentally mixing up the internal backup
//! key, the public backup id and transaction-log entry ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate string-backed ID newtype wrappers
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier (e.g. one read back from the database)
            pub fn from_string(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier text
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(BackupRecordId);
define_string_id!(BackupId);

impl BackupRecordId {
    /// Generate a fresh internal key: `bkp-<uuid>`
    pub fn generate() -> Self {
        Self(format!("bkp-{}", Uuid::new_v4().simple()))
    }
}

impl BackupId {
    /// Human-readable id derived from the creation time,
    /// e.g. `backup-2026-10-16_08-30-00-123`
    pub fn for_time(at: DateTime<Utc>) -> Self {
        Self(format!("backup-{}", at.format("%Y-%m-%d_%H-%M-%S-%3f")))
    }
}

/// Monotonically increasing id of a transaction log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntryId(i64);

impl LogEntryId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogEntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the "#42" form the CLI prints
        let s = s.strip_prefix('#').unwrap_or(s);
        Ok(Self(s.trim().parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_id_generation() {
        let a = BackupRecordId::generate();
        let b = BackupRecordId::generate();
        assert!(a.as_str().starts_with("bkp-"));
        assert_eq!(a.as_str().len(), 4 + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_backup_id_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 5).unwrap()
            + chrono::Duration::milliseconds(42);
        let id = BackupId::for_time(at);
        assert_eq!(id.as_str(), "backup-2026-10-16_08-30-05-042");
    }

    #[test]
    fn test_backup_id_serialization() {
        let id = BackupId::from_string("backup-2026-10-16_08-30-05-042");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"backup-2026-10-16_08-30-05-042\"");
        let back: BackupId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_log_entry_id_parse() {
        assert_eq!("42".parse::<LogEntryId>().unwrap(), LogEntryId::new(42));
        assert_eq!("#7".parse::<LogEntryId>().unwrap(), LogEntryId::new(7));
        assert!("abc".parse::<LogEntryId>().is_err());
    }
}
