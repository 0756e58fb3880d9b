//! Transaction log for audited tables
//!
//! Every mutation of an audited table is recorded with before/after
//! snapshots. Entries can be listed, undone one at a time, and replayed on top
//! of a restored backup.
//!
//! # Architecture
//!
//! - `LogRequest` / `TransactionLogEntry`: what a write path reports and what
//!   is persisted.
//! - `TransactionLogger`: writes entries (never failing the caller), queries
//!   them, undoes them and enforces retention.
//! - `apply_forward` / `apply_inverse`: schema-aware replay and undo.
//! - `generate_diff`: one-line summaries of UPDATE snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskvault::audit::{LogRequest, TransactionLogger};
//! use taskvault::models::TrackedTable;
//! use serde_json::json;
//!
//! let logger = TransactionLogger::new(db, settings.transaction_log.clone());
//! logger.log(
//!     LogRequest::update(TrackedTable::Tasks, "t1", before, after)
//!         .by_user("u1")
//!         .from_path("/api/taak/t1"),
//! );
//! ```

mod apply;
mod diff;
mod entry;
mod logger;

pub use apply::{apply_forward, apply_inverse, UndoResult};
pub use diff::generate_diff;
pub use entry::{LogPage, LogQuery, LogRequest, Operation, TransactionLogEntry};
pub use logger::TransactionLogger;
