//! Structured results of backup and restore runs
//!
//! Partial failures (one table that could not be exported, one log entry that
//! could not be replayed) are reported per unit instead of aborting the run.

use serde::Serialize;

use super::record::BackupRecord;
use crate::audit::Operation;
use crate::models::{BackupId, LogEntryId, TrackedTable};

/// Result of one unit of work inside a larger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Succeeded,
    Skipped { reason: String },
    Failed { reason: String },
}

impl UnitOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, UnitOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnitOutcome::Succeeded => "ok",
            UnitOutcome::Skipped { .. } => "skipped",
            UnitOutcome::Failed { .. } => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            UnitOutcome::Succeeded => None,
            UnitOutcome::Skipped { reason } | UnitOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// Per-table line of a backup or restore report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: TrackedTable,
    /// Rows exported, removed or inserted, depending on the phase
    pub rows: u64,
    /// Snapshot rows that could not be restored
    pub failed_rows: u64,
    pub outcome: UnitOutcome,
}

impl TableReport {
    pub fn succeeded(table: TrackedTable, rows: u64) -> Self {
        Self {
            table,
            rows,
            failed_rows: 0,
            outcome: UnitOutcome::Succeeded,
        }
    }

    /// Some rows restored, `failed_rows` rejected; `reason` is the first rejection
    pub fn partial(table: TrackedTable, rows: u64, failed_rows: u64, reason: &str) -> Self {
        Self {
            table,
            rows,
            failed_rows,
            outcome: UnitOutcome::Failed {
                reason: format!("{} row(s) not restored, first: {}", failed_rows, reason),
            },
        }
    }

    pub fn skipped(table: TrackedTable, reason: impl Into<String>) -> Self {
        Self {
            table,
            rows: 0,
            failed_rows: 0,
            outcome: UnitOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(table: TrackedTable, reason: impl Into<String>) -> Self {
        Self {
            table,
            rows: 0,
            failed_rows: 0,
            outcome: UnitOutcome::Failed {
                reason: reason.into(),
            },
        }
    }
}

/// A finished backup and how each table fared during export
#[derive(Debug, Clone, Serialize)]
pub struct BackupOutcome {
    pub record: BackupRecord,
    pub tables: Vec<TableReport>,
}

impl BackupOutcome {
    /// Completed, but at least one table was exported as empty after an error
    pub fn is_partial(&self) -> bool {
        self.tables.iter().any(|t| t.outcome.is_failed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// The entry changed the table
    Applied,
    /// Already reflected in the table (duplicate insert, absent delete, missing update target)
    Unchanged,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub entry_id: LogEntryId,
    pub operation: Operation,
    pub table: TrackedTable,
    pub record_id: String,
    pub outcome: ReplayOutcome,
}

/// Result of restoring one backup
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub backup_id: BackupId,
    pub success: bool,
    /// Non-identity tables whose snapshot held at least one row
    pub tables_restored: usize,
    /// Replayed entries that did not fail
    pub transactions_replayed: usize,
    /// Snapshot rows skipped because their key already existed
    pub duplicates_ignored: u64,
    /// Snapshot rows that were invalid or rejected by the database
    pub rows_failed: u64,
    /// Rows removed per table, in truncation order
    pub truncations: Vec<TableReport>,
    /// Rows inserted per table, in export order
    pub tables: Vec<TableReport>,
    pub replayed: Vec<ReplayReport>,
}

impl RestoreReport {
    pub fn replay_failures(&self) -> usize {
        self.replayed
            .iter()
            .filter(|r| matches!(r.outcome, ReplayOutcome::Failed { .. }))
            .count()
    }
}
