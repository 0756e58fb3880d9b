//! Data access for the `backup_metadata` table

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::database::{conversion_error, format_timestamp, parse_timestamp, Database};
use crate::backup::{BackupRecord, BackupStatus};
use crate::error::{VaultError, VaultResult};
use crate::models::{BackupId, BackupRecordId};

const SELECT_COLUMNS: &str = "SELECT id, backup_id, backup_type, storage_path, status, size_bytes, \
     record_counts, expires_at, error_message, created_at FROM backup_metadata";

/// Data access object for backup records
#[derive(Clone, Debug)]
pub struct BackupStore {
    db: Database,
}

impl BackupStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new record (normally `in_progress`)
    pub fn insert(&self, record: &BackupRecord) -> VaultResult<()> {
        let counts = serde_json::to_string(&record.record_counts)?;
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO backup_metadata (id, backup_id, backup_type, storage_path, status, \
                 size_bytes, record_counts, expires_at, error_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id.as_str(),
                    record.backup_id.as_str(),
                    record.backup_type.as_str(),
                    record.storage_path,
                    record.status.as_str(),
                    record.size_bytes.map(|s| s as i64),
                    counts,
                    format_timestamp(record.expires_at),
                    record.error_message,
                    format_timestamp(record.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Move an `in_progress` record to `completed`
    pub fn mark_completed(
        &self,
        id: &BackupRecordId,
        size_bytes: u64,
        record_counts: &BTreeMap<String, u64>,
    ) -> VaultResult<()> {
        let counts = serde_json::to_string(record_counts)?;
        self.transition(id, BackupStatus::Completed, |conn| {
            conn.execute(
                "UPDATE backup_metadata SET status = ?2, size_bytes = ?3, record_counts = ?4
                 WHERE id = ?1 AND status = 'in_progress'",
                params![
                    id.as_str(),
                    BackupStatus::Completed.as_str(),
                    size_bytes as i64,
                    counts
                ],
            )
        })
    }

    /// Move an `in_progress` record to `failed`
    pub fn mark_failed(&self, id: &BackupRecordId, error_message: &str) -> VaultResult<()> {
        self.transition(id, BackupStatus::Failed, |conn| {
            conn.execute(
                "UPDATE backup_metadata SET status = ?2, error_message = ?3
                 WHERE id = ?1 AND status = 'in_progress'",
                params![id.as_str(), BackupStatus::Failed.as_str(), error_message],
            )
        })
    }

    fn transition<F>(&self, id: &BackupRecordId, to: BackupStatus, f: F) -> VaultResult<()>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize>,
    {
        let changed = self.db.with_connection(|conn| Ok(f(conn)?))?;
        if changed == 0 {
            return match self.get(id.as_str())? {
                Some(existing) if existing.status.is_terminal() => {
                    Err(VaultError::Validation(format!(
                        "Backup {} is already {}, cannot mark it {}",
                        existing.backup_id, existing.status, to
                    )))
                }
                Some(existing) => Err(VaultError::Validation(format!(
                    "Backup {} is still {} but could not be marked {}",
                    existing.backup_id, existing.status, to
                ))),
                None => Err(VaultError::backup_not_found(id.as_str())),
            };
        }
        Ok(())
    }

    /// Look a record up by its internal id
    pub fn get(&self, id: &str) -> VaultResult<Option<BackupRecord>> {
        self.db.with_connection(|conn| {
            let record = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                    params![id],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Look a record up by internal id or public backup id
    pub fn find_by_reference(&self, reference: &str) -> VaultResult<Option<BackupRecord>> {
        self.db.with_connection(|conn| {
            let record = conn
                .query_row(
                    &format!("{} WHERE id = ?1 OR backup_id = ?1 LIMIT 1", SELECT_COLUMNS),
                    params![reference],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Newest first
    pub fn list(&self, status: Option<BackupStatus>, limit: u32) -> VaultResult<Vec<BackupRecord>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC, id DESC LIMIT ?2",
                SELECT_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![status.map(|s| s.as_str()), limit], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    pub fn count(&self, status: Option<BackupStatus>) -> VaultResult<u64> {
        self.db.with_connection(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM backup_metadata WHERE (?1 IS NULL OR status = ?1)",
                params![status.map(|s| s.as_str())],
                |row| row.get(0),
            )?;
            Ok(n.max(0) as u64)
        })
    }

    /// Records whose `expires_at` is strictly before `now`, oldest first
    pub fn list_expired(&self, now: DateTime<Utc>) -> VaultResult<Vec<BackupRecord>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE expires_at < ?1 ORDER BY created_at",
                SELECT_COLUMNS
            ))?;
            let records = stmt
                .query_map(params![format_timestamp(now)], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    /// Returns whether a record was removed
    pub fn delete(&self, id: &BackupRecordId) -> VaultResult<bool> {
        self.db.with_connection(|conn| {
            let changed = conn.execute(
                "DELETE FROM backup_metadata WHERE id = ?1",
                params![id.as_str()],
            )?;
            Ok(changed > 0)
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackupRecord> {
    let backup_type: String = row.get(2)?;
    let status: String = row.get(4)?;
    let size_bytes: Option<i64> = row.get(5)?;
    let counts: String = row.get(6)?;
    let expires_at: String = row.get(7)?;
    let created_at: String = row.get(9)?;

    Ok(BackupRecord {
        id: BackupRecordId::from_string(row.get::<_, String>(0)?),
        backup_id: BackupId::from_string(row.get::<_, String>(1)?),
        backup_type: backup_type.parse().map_err(|e| conversion_error(2, e))?,
        storage_path: row.get(3)?,
        status: status.parse().map_err(|e| conversion_error(4, e))?,
        size_bytes: size_bytes.map(|s| s.max(0) as u64),
        record_counts: serde_json::from_str(&counts).map_err(|e| conversion_error(6, e))?,
        expires_at: parse_timestamp(&expires_at).map_err(|e| conversion_error(7, e))?,
        error_message: row.get(8)?,
        created_at: parse_timestamp(&created_at).map_err(|e| conversion_error(9, e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupType;
    use chrono::{Duration, TimeZone};

    fn store() -> BackupStore {
        BackupStore::new(Database::open_in_memory().unwrap())
    }

    fn record_at(hour: u32) -> BackupRecord {
        let created = Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap();
        BackupRecord::start(BackupType::Scheduled, "database-backups", created, Duration::hours(24))
    }

    #[test]
    fn test_insert_and_get() {
        let store = store();
        let record = record_at(1);
        store.insert(&record).unwrap();

        let loaded = store.get(record.id.as_str()).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_find_by_either_reference() {
        let store = store();
        let record = record_at(2);
        store.insert(&record).unwrap();

        let by_public = store.find_by_reference(record.backup_id.as_str()).unwrap();
        assert_eq!(by_public.unwrap().id, record.id);
        let by_internal = store.find_by_reference(record.id.as_str()).unwrap();
        assert_eq!(by_internal.unwrap().backup_id, record.backup_id);
        assert!(store.find_by_reference("backup-nope").unwrap().is_none());
    }

    #[test]
    fn test_status_moves_exactly_once() {
        let store = store();
        let record = record_at(3);
        store.insert(&record).unwrap();

        let mut counts = BTreeMap::new();
        counts.insert("taken".to_string(), 2);
        store.mark_completed(&record.id, 512, &counts).unwrap();

        let loaded = store.get(record.id.as_str()).unwrap().unwrap();
        assert_eq!(loaded.status, BackupStatus::Completed);
        assert_eq!(loaded.size_bytes, Some(512));
        assert_eq!(loaded.record_counts, counts);

        let err = store.mark_failed(&record.id, "late failure").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("already completed"));
        let loaded = store.get(record.id.as_str()).unwrap().unwrap();
        assert_eq!(loaded.status, BackupStatus::Completed);
        assert!(loaded.error_message.is_none());
    }

    #[test]
    fn test_mark_failed_records_message() {
        let store = store();
        let record = record_at(4);
        store.insert(&record).unwrap();
        store.mark_failed(&record.id, "Object store unavailable").unwrap();

        let loaded = store.get(record.id.as_str()).unwrap().unwrap();
        assert_eq!(loaded.status, BackupStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("Object store unavailable"));
    }

    #[test]
    fn test_transition_unknown_record() {
        let err = store()
            .mark_failed(&BackupRecordId::from_string("bkp-missing"), "x")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_newest_first_with_filter() {
        let store = store();
        let (a, b, c) = (record_at(1), record_at(2), record_at(3));
        for r in [&a, &b, &c] {
            store.insert(r).unwrap();
        }
        store.mark_completed(&b.id, 10, &BTreeMap::new()).unwrap();

        let all = store.list(None, 10).unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![c.id.clone(), b.id.clone(), a.id.clone()]);

        let completed = store.list(Some(BackupStatus::Completed), 10).unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(store.count(Some(BackupStatus::InProgress)).unwrap(), 2);
        assert_eq!(store.list(None, 1).unwrap().len(), 1);
        assert_eq!(store.count(None).unwrap(), 3);
    }

    #[test]
    fn test_list_expired_is_strict() {
        let store = store();
        let record = record_at(0);
        store.insert(&record).unwrap();

        assert!(store.list_expired(record.expires_at).unwrap().is_empty());
        let later = record.expires_at + Duration::seconds(1);
        assert_eq!(store.list_expired(later).unwrap().len(), 1);

        assert!(store.delete(&record.id).unwrap());
        assert!(!store.delete(&record.id).unwrap());
    }
}
