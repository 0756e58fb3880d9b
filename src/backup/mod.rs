//! Point-in-time backups for taskvault
//!
//! # Architecture
//!
//! - `BackupManager`: creates full snapshots, lists and downloads them,
//!   restores them (with optional transaction log replay) and expires them.
//! - `BackupRecord`: lifecycle row in `backup_metadata`
//!   (`in_progress` -> `completed` | `failed`).
//! - `BackupDocument`: the gzip-compressed JSON blob stored in the object store.
//!
//! # Backup Format
//!
//! One JSON object with a row array per tracked table and a `_metadata`
//! manifest holding `backupId`, `createdAt`, `type`, `tables` and
//! `recordCounts`. Blobs live at `<folder>/<backupId>.json.gz`.
//!
//! # Retention
//!
//! Every backup expires a fixed window after creation (24 hours by default);
//! `cleanup_expired` removes the blob and the metadata row.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskvault::backup::{BackupManager, BackupType};
//! use taskvault::object_store::FsObjectStore;
//!
//! let store = Arc::new(FsObjectStore::open(paths.object_store_dir(), &settings.backup.bucket)?);
//! let manager = BackupManager::new(db, store, settings.backup.clone());
//!
//! let outcome = manager.create_backup(BackupType::Manual)?;
//! let report = manager.restore_backup(outcome.record.backup_id.as_str(), true)?;
//! println!("{} tables restored", report.tables_restored);
//! ```

mod archive;
mod manager;
mod outcome;
mod record;
mod restore;

pub use archive::{compress, decompress, BackupDocument, BackupManifest};
pub use manager::BackupManager;
pub use outcome::{
    BackupOutcome, ReplayOutcome, ReplayReport, RestoreReport, TableReport, UnitOutcome,
};
pub use record::{
    storage_path, BackupPage, BackupRecord, BackupStatus, BackupType, ListOptions,
};
