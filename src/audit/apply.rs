//! Applying log entries to the tracked tables
//!
//! Replay runs an entry forward with idempotent semantics; undo runs its
//! inverse and insists that the target row is in the expected state.

use rusqlite::Connection;
use serde::Serialize;

use super::entry::{Operation, TransactionLogEntry};
use crate::error::{VaultError, VaultResult};
use crate::models::{LogEntryId, TrackedTable};
use crate::storage::tables;

/// Forward-apply an entry: insert-or-ignore, update-if-exists, delete-if-exists
///
/// Returns whether the table changed.
pub fn apply_forward(conn: &Connection, entry: &TransactionLogEntry) -> VaultResult<bool> {
    let key = entry.table.key_value(&entry.record_id)?;
    match entry.operation {
        Operation::Insert => tables::insert_or_ignore(conn, &entry.new_row()?.with_key(key)),
        Operation::Update => tables::update(conn, &entry.new_row()?.with_key(key)),
        Operation::Delete => tables::delete(conn, entry.table, &key),
    }
}

/// What an undo did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoResult {
    pub entry_id: LogEntryId,
    pub operation: Operation,
    pub table: TrackedTable,
    pub record_id: String,
    /// False only when an INSERT is undone for a row that is already gone
    pub changed: bool,
    pub message: String,
}

/// Apply the inverse of an entry
pub fn apply_inverse(conn: &Connection, entry: &TransactionLogEntry) -> VaultResult<UndoResult> {
    let table = entry.table;
    let key = table.key_value(&entry.record_id)?;

    let (changed, message) = match entry.operation {
        Operation::Insert => {
            if tables::delete(conn, table, &key)? {
                (true, format!("Deleted {} record {}", table, entry.record_id))
            } else {
                (
                    false,
                    format!("{} record {} was already absent", table, entry.record_id),
                )
            }
        }
        Operation::Delete => {
            let row = entry.old_row()?.with_key(key.clone());
            if tables::exists(conn, table, &key)? {
                return Err(VaultError::Duplicate {
                    entity_type: "Record",
                    identifier: format!("{}:{}", table, entry.record_id),
                });
            }
            tables::insert(conn, &row)?;
            (true, format!("Restored {} record {}", table, entry.record_id))
        }
        Operation::Update => {
            let row = entry.old_row()?.with_key(key);
            if !tables::update(conn, &row)? {
                return Err(VaultError::record_not_found(table, entry.record_id.clone()));
            }
            (
                true,
                format!("Reverted {} record {} to its previous values", table, entry.record_id),
            )
        }
    };

    Ok(UndoResult {
        entry_id: entry.id,
        operation: entry.operation,
        table,
        record_id: entry.record_id.clone(),
        changed,
        message,
    })
}
