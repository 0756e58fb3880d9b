//! Backup restoration for taskvault
//!
//! Restore replaces the contents of every tracked table except `users` with
//! the snapshot, then replays transaction log entries recorded after the
//! snapshot was taken. The whole run is one SQLite transaction; each
//! truncation and each replayed entry gets its own savepoint so a failure only
//! rolls back itself.

use rusqlite::Transaction;
use serde_json::Value;

use super::archive::BackupDocument;
use super::manager::BackupManager;
use super::outcome::{ReplayOutcome, ReplayReport, RestoreReport, TableReport};
use crate::audit::{apply_forward, TransactionLogEntry};
use crate::error::{VaultError, VaultResult};
use crate::models::{Row, TrackedTable};
use crate::storage::{tables, transaction_log};

/// What the insert phase did across all tables
struct SnapshotInsert {
    tables: Vec<TableReport>,
    tables_restored: usize,
    duplicates_ignored: u64,
    rows_failed: u64,
}

impl BackupManager {
    /// Restore a completed backup, optionally replaying later log entries
    ///
    /// Only a snapshot that cannot be decoded aborts the restore. Rows that
    /// fail validation or insertion, failed truncations and failed replay
    /// entries are reported and skipped.
    pub fn restore_backup(&self, reference: &str, replay: bool) -> VaultResult<RestoreReport> {
        let record = self.get_backup(reference)?;
        let blob = self.download_record(&record)?;

        let document = BackupDocument::from_gzip(&blob).map_err(|e| {
            VaultError::Structural(format!("backup {} is unreadable: {}", record.backup_id, e))
        })?;
        let manifest = &document.metadata;

        tracing::info!(
            backup_id = %record.backup_id,
            created_at = %manifest.created_at,
            tables = %manifest.tables.join(", "),
            replay,
            "Starting restore"
        );

        for name in document.tables.keys() {
            if name.parse::<TrackedTable>().is_err() {
                tracing::warn!(table = %name, "Ignoring untracked table in backup");
            }
        }

        let mut report = self.db.with_connection_mut(|conn| {
            let mut tx = conn.transaction()?;

            let truncations = truncate_tables(&mut tx)?;
            let inserted = insert_snapshots(&tx, &document, &truncations);

            let replayed = if replay {
                let entries = transaction_log::entries_after(&tx, manifest.created_at)?;
                replay_entries(&mut tx, &entries)?
            } else {
                Vec::new()
            };

            tx.commit()?;

            Ok(RestoreReport {
                backup_id: record.backup_id.clone(),
                success: true,
                tables_restored: inserted.tables_restored,
                transactions_replayed: 0,
                duplicates_ignored: inserted.duplicates_ignored,
                rows_failed: inserted.rows_failed,
                truncations,
                tables: inserted.tables,
                replayed,
            })
        })?;

        report.transactions_replayed = report.replayed.len() - report.replay_failures();

        tracing::info!(
            backup_id = %record.backup_id,
            tables_restored = report.tables_restored,
            rows_failed = report.rows_failed,
            transactions_replayed = report.transactions_replayed,
            replay_failures = report.replay_failures(),
            "Restore completed"
        );
        Ok(report)
    }
}

/// Empty every non-identity table, last exported first
fn truncate_tables(tx: &mut Transaction<'_>) -> VaultResult<Vec<TableReport>> {
    let mut reports = Vec::new();

    for table in TrackedTable::ALL.into_iter().rev() {
        if table.is_identity() {
            tracing::debug!(table = %table, "Preserving identity table");
            continue;
        }

        let sp = tx
            .savepoint()
            .map_err(|e| VaultError::Structural(format!("cannot truncate {}: {}", table, e)))?;
        match tables::clear(&sp, table) {
            Ok(removed) => {
                sp.commit().map_err(|e| {
                    VaultError::Structural(format!("cannot truncate {}: {}", table, e))
                })?;
                tracing::debug!(table = %table, removed, "Truncated table");
                reports.push(TableReport::succeeded(table, removed as u64));
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Truncation failed");
                reports.push(TableReport::failed(table, e.to_string()));
            }
        }
    }

    Ok(reports)
}

/// Insert-or-ignore every snapshot row, one row at a time
fn insert_snapshots(
    tx: &Transaction<'_>,
    document: &BackupDocument,
    truncations: &[TableReport],
) -> SnapshotInsert {
    let mut result = SnapshotInsert {
        tables: vec![TableReport::skipped(
            TrackedTable::Users,
            "identity table is preserved",
        )],
        tables_restored: 0,
        duplicates_ignored: 0,
        rows_failed: 0,
    };

    for table in TrackedTable::ALL.into_iter().filter(|t| !t.is_identity()) {
        let truncation_failed = truncations
            .iter()
            .any(|t| t.table == table && t.outcome.is_failed());
        if truncation_failed {
            result.tables.push(TableReport::skipped(table, "truncation failed"));
            continue;
        }

        let Some(rows) = document.rows(table.name()) else {
            result
                .tables
                .push(TableReport::skipped(table, "not present in backup"));
            continue;
        };
        if !rows.is_empty() {
            result.tables_restored += 1;
        }

        let mut inserted = 0;
        let mut duplicates = 0;
        let mut failed = 0;
        let mut first_error = None;
        for value in rows {
            match insert_row(tx, table, value) {
                Ok(true) => inserted += 1,
                Ok(false) => duplicates += 1,
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Snapshot row not restored");
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                }
            }
        }

        if duplicates > 0 {
            tracing::warn!(
                table = %table,
                ignored = duplicates,
                "Snapshot rows ignored because their key already exists"
            );
        }
        tracing::debug!(table = %table, inserted, failed, "Restored table");

        result.duplicates_ignored += duplicates;
        result.rows_failed += failed;
        result.tables.push(match first_error {
            Some(reason) => TableReport::partial(table, inserted, failed, &reason),
            None => TableReport::succeeded(table, inserted),
        });
    }

    result
}

fn insert_row(tx: &Transaction<'_>, table: TrackedTable, value: &Value) -> VaultResult<bool> {
    let row = Row::from_json(table, value)?;
    tables::insert_or_ignore(tx, &row)
}

/// Forward-apply entries in order, each inside its own savepoint
fn replay_entries(
    tx: &mut Transaction<'_>,
    entries: &[TransactionLogEntry],
) -> VaultResult<Vec<ReplayReport>> {
    let mut reports = Vec::with_capacity(entries.len());

    for entry in entries {
        let sp = tx.savepoint()?;
        let outcome = match apply_forward(&sp, entry) {
            Ok(changed) => {
                sp.commit()?;
                if changed {
                    ReplayOutcome::Applied
                } else {
                    ReplayOutcome::Unchanged
                }
            }
            Err(e) => {
                tracing::warn!(
                    id = %entry.id,
                    table = %entry.table,
                    record_id = %entry.record_id,
                    error = %e,
                    "Replay of transaction failed"
                );
                ReplayOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        reports.push(ReplayReport {
            entry_id: entry.id,
            operation: entry.operation,
            table: entry.table,
            record_id: entry.record_id.clone(),
            outcome,
        });
    }

    if !entries.is_empty() {
        tracing::debug!(count = entries.len(), "Replayed transactions");
    }
    Ok(reports)
}
