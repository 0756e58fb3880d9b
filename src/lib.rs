//! taskvault - point-in-time backups and transaction-log replay for a task database
//!
//! This library snapshots the tracked tables of a SQLite task database into
//! compressed blobs in an object store, records every mutation of the
//! audited tables in a transaction log, and restores a snapshot with the
//! logged changes replayed on top.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Tracked table schemas, schema-checked rows and typed ids
//! - `storage`: SQLite database, migrations and per-table access
//! - `object_store`: Blob storage for backup snapshots
//! - `audit`: Transaction logger, undo and replay
//! - `backup`: Backup manager (create, list, download, restore, expire)
//! - `cli`: Command handlers for the `taskvault` binary
//! - `display`: Terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use taskvault::audit::{LogRequest, TransactionLogger};
//! use taskvault::config::{Settings, VaultPaths};
//! use taskvault::models::TrackedTable;
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let db = taskvault::storage::initialize(&paths)?;
//!
//! let logger = TransactionLogger::new(db, settings.transaction_log.clone());
//! logger.log(LogRequest::insert(TrackedTable::Tasks, "t1", task_json));
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod object_store;
pub mod storage;

pub use error::{VaultError, VaultResult};
