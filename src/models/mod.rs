//! Core data models for taskvault
//!
//! This module contains the schema-level types shared by the transaction
//! logger and the backup manager.

pub mod ids;
pub mod row;
pub mod table;

pub use ids::{BackupId, BackupRecordId, LogEntryId};
pub use row::Row;
pub use table::{Column, ColumnKind, TableSchema, TableStatements, TrackedTable};
