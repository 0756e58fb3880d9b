//! Backup manager for taskvault
//!
//! Exports every tracked table into one compressed document, uploads it to the
//! object store and tracks its lifecycle in `backup_metadata`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::archive::{BackupDocument, BackupManifest};
use super::outcome::{BackupOutcome, TableReport};
use super::record::{BackupPage, BackupRecord, BackupStatus, BackupType, ListOptions};
use crate::config::BackupSettings;
use crate::error::{VaultError, VaultResult};
use crate::models::TrackedTable;
use crate::object_store::{sha256_hex, ObjectStore};
use crate::storage::{tables, BackupStore, Database};

/// Creates, lists, downloads, restores and expires backups
pub struct BackupManager {
    pub(super) db: Database,
    pub(super) store: Arc<dyn ObjectStore>,
    pub(super) backups: BackupStore,
    settings: BackupSettings,
}

/// Rows exported per table, plus the per-table report
struct Export {
    tables: BTreeMap<String, Vec<Value>>,
    record_counts: BTreeMap<String, u64>,
    reports: Vec<TableReport>,
}

impl BackupManager {
    pub fn new(db: Database, store: Arc<dyn ObjectStore>, settings: BackupSettings) -> Self {
        Self {
            backups: BackupStore::new(db.clone()),
            db,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Take a full snapshot of every tracked table
    ///
    /// A table that cannot be read is exported as empty and reported as failed.
    /// Any error after the record is created marks the record `failed` and is
    /// returned to the caller.
    pub fn create_backup(&self, backup_type: BackupType) -> VaultResult<BackupOutcome> {
        let mut record = self.start_record(backup_type)?;
        self.backups.insert(&record)?;

        tracing::info!(
            backup_id = %record.backup_id,
            backup_type = %backup_type,
            "Starting backup"
        );

        match self.run_backup(&record) {
            Ok((size_bytes, record_counts, reports)) => {
                self.backups
                    .mark_completed(&record.id, size_bytes, &record_counts)?;
                record.status = BackupStatus::Completed;
                record.size_bytes = Some(size_bytes);
                record.record_counts = record_counts;

                tracing::info!(
                    backup_id = %record.backup_id,
                    size_bytes,
                    records = record.total_records(),
                    "Backup completed"
                );
                Ok(BackupOutcome {
                    record,
                    tables: reports,
                })
            }
            Err(e) => {
                tracing::error!(backup_id = %record.backup_id, error = %e, "Backup failed");
                if let Err(mark_err) = self.backups.mark_failed(&record.id, &e.to_string()) {
                    tracing::error!(
                        backup_id = %record.backup_id,
                        error = %mark_err,
                        "Could not record backup failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// A fresh record whose public id is not taken yet
    fn start_record(&self, backup_type: BackupType) -> VaultResult<BackupRecord> {
        loop {
            let record = BackupRecord::start(
                backup_type,
                &self.settings.folder,
                Utc::now(),
                self.settings.retention(),
            );
            if self
                .backups
                .find_by_reference(record.backup_id.as_str())?
                .is_none()
            {
                return Ok(record);
            }
            // Public ids have millisecond resolution
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    fn run_backup(
        &self,
        record: &BackupRecord,
    ) -> VaultResult<(u64, BTreeMap<String, u64>, Vec<TableReport>)> {
        let export = self.export_tables()?;

        let document = BackupDocument {
            tables: export.tables,
            metadata: BackupManifest {
                backup_id: record.backup_id.clone(),
                created_at: record.created_at,
                backup_type: record.backup_type,
                tables: TrackedTable::ALL.iter().map(|t| t.name().to_string()).collect(),
                record_counts: export.record_counts,
            },
        };

        let compressed = document.to_gzip()?;
        let size_bytes = compressed.len() as u64;
        tracing::debug!(backup_id = %record.backup_id, size_bytes, "Compressed backup");

        let target = self.store.upload_target()?;
        let object = self.store.upload(
            &target,
            &record.storage_path,
            &compressed,
            &sha256_hex(&compressed),
        )?;
        if object.size_bytes != size_bytes {
            return Err(VaultError::ObjectStore(format!(
                "Uploaded {} bytes for {} but the store reports {}",
                size_bytes, record.storage_path, object.size_bytes
            )));
        }
        tracing::debug!(path = %record.storage_path, file_id = %object.file_id, "Uploaded backup");

        Ok((size_bytes, document.metadata.record_counts, export.reports))
    }

    /// Read every tracked table inside one read transaction
    fn export_tables(&self) -> VaultResult<Export> {
        self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            let mut export = Export {
                tables: BTreeMap::new(),
                record_counts: BTreeMap::new(),
                reports: Vec::with_capacity(TrackedTable::ALL.len()),
            };

            for table in TrackedTable::ALL {
                let (rows, report) = match tables::select_all(&tx, table) {
                    Ok(rows) => {
                        let rows: Vec<Value> = rows.iter().map(|r| r.to_json()).collect();
                        tracing::debug!(table = %table, rows = rows.len(), "Exported table");
                        let report = TableReport::succeeded(table, rows.len() as u64);
                        (rows, report)
                    }
                    Err(e) => {
                        tracing::warn!(table = %table, error = %e, "Table export failed, storing it empty");
                        (Vec::new(), TableReport::failed(table, e.to_string()))
                    }
                };
                export
                    .record_counts
                    .insert(table.name().to_string(), rows.len() as u64);
                export.tables.insert(table.name().to_string(), rows);
                export.reports.push(report);
            }

            tx.commit()?;
            Ok(export)
        })
    }

    /// Newest first; `total` ignores the limit
    pub fn list_backups(&self, options: &ListOptions) -> VaultResult<BackupPage> {
        let limit = options.limit.unwrap_or(self.settings.list_limit);
        Ok(BackupPage {
            backups: self.backups.list(options.status, limit)?,
            total: self.backups.count(options.status)?,
        })
    }

    /// Resolve a backup by internal id or public backup id
    pub fn get_backup(&self, reference: &str) -> VaultResult<BackupRecord> {
        self.backups
            .find_by_reference(reference)?
            .ok_or_else(|| VaultError::backup_not_found(reference))
    }

    /// Raw compressed blob of a completed backup
    pub fn download_backup(&self, reference: &str) -> VaultResult<Vec<u8>> {
        let record = self.get_backup(reference)?;
        self.download_record(&record)
    }

    pub(super) fn download_record(&self, record: &BackupRecord) -> VaultResult<Vec<u8>> {
        if record.status != BackupStatus::Completed {
            return Err(VaultError::Validation(format!(
                "Backup {} is not completed (status: {})",
                record.backup_id, record.status
            )));
        }
        self.store.download_by_name(&record.storage_path)
    }

    /// Delete every backup whose expiry has passed
    pub fn cleanup_expired(&self) -> VaultResult<usize> {
        self.cleanup_expired_at(Utc::now())
    }

    /// Best effort per backup: a failed blob or metadata delete is logged and
    /// the remaining backups are still processed
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> VaultResult<usize> {
        let expired = self.backups.list_expired(now)?;
        let mut deleted = 0;

        for record in &expired {
            if let Err(e) = self.delete_blob(record) {
                tracing::warn!(
                    backup_id = %record.backup_id,
                    path = %record.storage_path,
                    error = %e,
                    "Could not delete backup blob"
                );
            }
            match self.backups.delete(&record.id) {
                Ok(true) => {
                    tracing::debug!(backup_id = %record.backup_id, "Deleted expired backup");
                    deleted += 1;
                }
                Ok(false) => {}
                Err(e) => tracing::error!(
                    backup_id = %record.backup_id,
                    error = %e,
                    "Could not delete backup metadata"
                ),
            }
        }

        if deleted > 0 {
            tracing::info!(deleted, "Cleaned up expired backups");
        }
        Ok(deleted)
    }

    fn delete_blob(&self, record: &BackupRecord) -> VaultResult<()> {
        let versions = self.store.list_by_prefix(&record.storage_path, 1)?;
        for object in versions
            .iter()
            .filter(|o| o.file_name == record.storage_path)
        {
            self.store
                .delete_version(&object.file_id, &object.file_name)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupManager")
            .field("db", &self.db)
            .field("bucket", &self.store.bucket())
            .field("settings", &self.settings)
            .finish()
    }
}
