//! Transaction logger backed by the `transaction_log` table
//!
//! Logging is a side channel of the write it audits: rejected requests and
//! persistence failures are traced and reported as `None`, never as errors.

use chrono::{DateTime, SubsecRound, Utc};

use super::apply::{apply_inverse, UndoResult};
use super::entry::{LogPage, LogQuery, LogRequest, TransactionLogEntry};
use crate::config::TransactionLogSettings;
use crate::error::{VaultError, VaultResult};
use crate::models::LogEntryId;
use crate::storage::{transaction_log, Database};

/// Records mutations of audited tables and undoes them on request
#[derive(Debug, Clone)]
pub struct TransactionLogger {
    db: Database,
    settings: TransactionLogSettings,
}

impl TransactionLogger {
    pub fn new(db: Database, settings: TransactionLogSettings) -> Self {
        Self { db, settings }
    }

    /// Record one mutation, stamped now
    pub fn log(&self, request: LogRequest) -> Option<TransactionLogEntry> {
        self.log_at(request, Utc::now())
    }

    /// Record one mutation with an explicit timestamp
    ///
    /// The timestamp is truncated to the microseconds the log stores.
    pub fn log_at(&self, request: LogRequest, at: DateTime<Utc>) -> Option<TransactionLogEntry> {
        let at = at.trunc_subsecs(6);
        if let Err(e) = request.validate() {
            tracing::warn!(
                table = %request.table,
                operation = %request.operation,
                record_id = %request.record_id,
                error = %e,
                "Rejected transaction log request"
            );
            return None;
        }

        match self
            .db
            .with_connection(|conn| transaction_log::insert(conn, &request, at))
        {
            Ok(entry) => {
                tracing::debug!(
                    id = %entry.id,
                    table = %entry.table,
                    operation = %entry.operation,
                    record_id = %entry.record_id,
                    "Logged transaction"
                );
                Some(entry)
            }
            Err(e) => {
                tracing::error!(
                    table = %request.table,
                    operation = %request.operation,
                    record_id = %request.record_id,
                    error = %e,
                    "Failed to write transaction log entry"
                );
                None
            }
        }
    }

    /// Entries matching `query`, newest first
    pub fn get_log_since(&self, query: &LogQuery) -> VaultResult<LogPage> {
        let limit = query.limit.unwrap_or(self.settings.query_limit);
        let (entries, total) = self
            .db
            .with_connection(|conn| transaction_log::query(conn, query, limit))?;
        Ok(LogPage { entries, total })
    }

    pub fn get_entry(&self, id: LogEntryId) -> VaultResult<TransactionLogEntry> {
        self.db
            .with_connection(|conn| transaction_log::get(conn, id))?
            .ok_or_else(|| VaultError::log_entry_not_found(id.to_string()))
    }

    /// Apply the inverse of one logged mutation
    pub fn undo_operation(&self, id: LogEntryId) -> VaultResult<UndoResult> {
        let result = self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let entry = transaction_log::get(&tx, id)?
                .ok_or_else(|| VaultError::log_entry_not_found(id.to_string()))?;

            tracing::info!(
                id = %id,
                operation = %entry.operation,
                table = %entry.table,
                record_id = %entry.record_id,
                "Undoing transaction"
            );

            let result = apply_inverse(&tx, &entry)?;
            tx.commit()?;
            Ok(result)
        })?;

        tracing::info!(id = %id, changed = result.changed, "{}", result.message);
        Ok(result)
    }

    /// Delete entries older than the retention window
    pub fn cleanup(&self) -> VaultResult<usize> {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&self, now: DateTime<Utc>) -> VaultResult<usize> {
        let cutoff = now - self.settings.retention();
        let removed = self
            .db
            .with_connection(|conn| transaction_log::delete_older_than(conn, cutoff))?;

        if removed > 0 {
            tracing::info!(removed, cutoff = %cutoff, "Cleaned up transaction log");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Operation;
    use crate::models::{Row, TrackedTable};
    use crate::storage::tables;
    use chrono::{Duration, TimeZone};
    use rusqlite::types::Value as SqlValue;
    use serde_json::{json, Value};

    fn logger() -> (Database, TransactionLogger) {
        let db = Database::open_in_memory().unwrap();
        let logger = TransactionLogger::new(db.clone(), TransactionLogSettings::default());
        (db, logger)
    }

    fn write_row(db: &Database, table: TrackedTable, snapshot: &Value) {
        db.with_connection(|conn| tables::insert(conn, &Row::from_json(table, snapshot)?))
            .unwrap();
    }

    fn read_row(db: &Database, table: TrackedTable, key: SqlValue) -> Option<Value> {
        db.with_connection(|conn| tables::find(conn, table, &key))
            .unwrap()
            .map(|row| row.to_json())
    }

    #[test]
    fn test_log_returns_entry() {
        let (_, logger) = logger();
        let entry = logger
            .log(
                LogRequest::insert(TrackedTable::Tasks, "t1", json!({"id": "t1"}))
                    .by_user("u1")
                    .from_path("/api/taak"),
            )
            .unwrap();

        assert_eq!(entry.operation, Operation::Insert);
        assert_eq!(logger.get_entry(entry.id).unwrap(), entry);
    }

    #[test]
    fn test_logged_timestamp_matches_stored_precision() {
        let (_, logger) = logger();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 3, 41, 11).unwrap()
            + Duration::nanoseconds(542_320_228);
        let entry = logger
            .log_at(
                LogRequest::insert(TrackedTable::Tasks, "t1", json!({"id": "t1"})),
                at,
            )
            .unwrap();

        assert_eq!(entry.timestamp.timestamp_subsec_nanos(), 542_320_000);
        assert_eq!(logger.get_entry(entry.id).unwrap().timestamp, entry.timestamp);
    }

    #[test]
    fn test_rejected_requests_return_none() {
        let (_, logger) = logger();
        assert!(logger
            .log(LogRequest::insert(TrackedTable::Users, "u1", json!({"id": "u1"})))
            .is_none());
        assert!(logger
            .log(LogRequest::delete(TrackedTable::Tasks, "t1", json!("not an object")))
            .is_none());

        let page = logger.get_log_since(&LogQuery::new()).unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_undo_insert_removes_row() {
        let (db, logger) = logger();
        let snapshot = json!({"id": "t1", "tekst": "Bellen", "lijst": "inbox"});
        write_row(&db, TrackedTable::Tasks, &snapshot);
        let entry = logger
            .log(LogRequest::insert(TrackedTable::Tasks, "t1", snapshot))
            .unwrap();

        let result = logger.undo_operation(entry.id).unwrap();
        assert!(result.changed);
        assert!(read_row(&db, TrackedTable::Tasks, SqlValue::Text("t1".into())).is_none());
    }

    #[test]
    fn test_undo_delete_reinserts_snapshot() {
        let (db, logger) = logger();
        let snapshot = json!({"id": "p1", "naam": "Verbouwing", "user_id": "u1", "aangemaakt": null});
        let entry = logger
            .log(LogRequest::delete(TrackedTable::Projects, "p1", snapshot.clone()))
            .unwrap();

        logger.undo_operation(entry.id).unwrap();
        let restored = read_row(&db, TrackedTable::Projects, SqlValue::Text("p1".into())).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_undo_update_restores_previous_values() {
        let (db, logger) = logger();
        let before = json!({"id": 7, "parent_taak_id": "t1", "titel": "Offerte", "voltooid": false, "volgorde": 1, "created_at": null});
        let after = json!({"id": 7, "parent_taak_id": "t1", "titel": "Offerte", "voltooid": true, "volgorde": 1, "created_at": null});
        write_row(&db, TrackedTable::Subtasks, &after);
        let entry = logger
            .log(LogRequest::update(TrackedTable::Subtasks, "7", before.clone(), after))
            .unwrap();

        logger.undo_operation(entry.id).unwrap();
        let row = read_row(&db, TrackedTable::Subtasks, SqlValue::Integer(7)).unwrap();
        assert_eq!(row, before);
    }

    #[test]
    fn test_undo_unknown_entry() {
        let (_, logger) = logger();
        let err = logger.undo_operation(LogEntryId::new(404)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_query_limit_defaults_to_settings() {
        let (_, logger) = logger();
        for i in 0..105 {
            logger
                .log(LogRequest::insert(
                    TrackedTable::Contexts,
                    format!("c{}", i),
                    json!({"id": format!("c{}", i)}),
                ))
                .unwrap();
        }
        let page = logger.get_log_since(&LogQuery::new()).unwrap();
        assert_eq!(page.entries.len(), 100);
        assert_eq!(page.total, 105);

        let page = logger.get_log_since(&LogQuery::new().limit(5)).unwrap();
        assert_eq!(page.entries.len(), 5);
    }

    #[test]
    fn test_cleanup_respects_retention_window() {
        let (_, logger) = logger();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let request = || LogRequest::insert(TrackedTable::Tasks, "t1", json!({"id": "t1"}));

        logger.log_at(request(), now - Duration::hours(73)).unwrap();
        logger.log_at(request(), now - Duration::hours(72)).unwrap();
        logger.log_at(request(), now - Duration::hours(1)).unwrap();

        assert_eq!(logger.cleanup_at(now).unwrap(), 1);
        assert_eq!(logger.cleanup_at(now).unwrap(), 0);
        let page = logger.get_log_since(&LogQuery::new()).unwrap();
        assert_eq!(page.total, 2);
    }
}
