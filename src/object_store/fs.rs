//! Filesystem-backed object store
//!
//! Layout: `<root>/<bucket>/<file_name>` holds the blob and
//! `<root>/<bucket>/<file_name>.meta.json` describes the current version.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use super::{object_missing, verify_upload, ObjectStore, StoredObject, UploadTarget};
use crate::error::{VaultError, VaultResult};
use crate::storage::{read_json_required, write_bytes_atomic, write_json_atomic};

const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    bucket: String,
    bucket_dir: PathBuf,
}

impl FsObjectStore {
    /// Open (and create if needed) `bucket` under `root`
    pub fn open(root: impl AsRef<Path>, bucket: impl Into<String>) -> VaultResult<Self> {
        let bucket = bucket.into();
        let bucket_dir = root.as_ref().join(&bucket);
        fs::create_dir_all(&bucket_dir).map_err(|e| {
            VaultError::ObjectStore(format!(
                "Cannot open bucket {}: {}",
                bucket_dir.display(),
                e
            ))
        })?;
        Ok(Self { bucket, bucket_dir })
    }

    fn blob_path(&self, file_name: &str) -> PathBuf {
        self.bucket_dir.join(file_name)
    }

    fn sidecar_path(&self, file_name: &str) -> PathBuf {
        self.bucket_dir.join(format!("{}{}", file_name, SIDECAR_SUFFIX))
    }

    fn read_sidecar(&self, file_name: &str) -> VaultResult<Option<StoredObject>> {
        let path = self.sidecar_path(file_name);
        if !path.exists() {
            return Ok(None);
        }
        read_json_required(path).map(Some)
    }

    fn collect_sidecars(&self, dir: &Path, out: &mut Vec<StoredObject>) -> VaultResult<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_sidecars(&path, out)?;
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(SIDECAR_SUFFIX))
            {
                out.push(read_json_required(&path)?);
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn upload_target(&self) -> VaultResult<UploadTarget> {
        if !self.bucket_dir.is_dir() {
            return Err(VaultError::ObjectStore(format!(
                "Bucket directory missing: {}",
                self.bucket_dir.display()
            )));
        }
        Ok(UploadTarget {
            bucket: self.bucket.clone(),
            token: Uuid::new_v4().simple().to_string(),
        })
    }

    fn upload(
        &self,
        target: &UploadTarget,
        file_name: &str,
        data: &[u8],
        content_sha256: &str,
    ) -> VaultResult<StoredObject> {
        verify_upload(&self.bucket, target, file_name, data, content_sha256)?;

        write_bytes_atomic(self.blob_path(file_name), data)
            .map_err(|e| VaultError::ObjectStore(format!("Upload of {} failed: {}", file_name, e)))?;

        let object = StoredObject {
            file_id: Uuid::new_v4().simple().to_string(),
            file_name: file_name.to_string(),
            size_bytes: data.len() as u64,
            content_sha256: content_sha256.to_ascii_lowercase(),
            uploaded_at: Utc::now().trunc_subsecs(6),
        };
        write_json_atomic(self.sidecar_path(file_name), &object)?;

        tracing::debug!(file = %file_name, size = object.size_bytes, "Stored object");
        Ok(object)
    }

    fn download_by_name(&self, file_name: &str) -> VaultResult<Vec<u8>> {
        if self.read_sidecar(file_name)?.is_none() {
            return Err(object_missing(file_name));
        }
        fs::read(self.blob_path(file_name)).map_err(|e| {
            VaultError::ObjectStore(format!("Download of {} failed: {}", file_name, e))
        })
    }

    fn list_by_prefix(&self, prefix: &str, max_count: usize) -> VaultResult<Vec<StoredObject>> {
        let mut objects = Vec::new();
        self.collect_sidecars(&self.bucket_dir, &mut objects)?;
        objects.retain(|o| o.file_name.starts_with(prefix));
        objects.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        objects.truncate(max_count);
        Ok(objects)
    }

    fn delete_version(&self, file_id: &str, file_name: &str) -> VaultResult<()> {
        match self.read_sidecar(file_name)? {
            Some(object) if object.file_id == file_id => {
                fs::remove_file(self.blob_path(file_name))?;
                fs::remove_file(self.sidecar_path(file_name))?;
                tracing::debug!(file = %file_name, "Deleted object version");
                Ok(())
            }
            _ => Err(VaultError::ObjectStore(format!(
                "No version {} of {}",
                file_id, file_name
            ))),
        }
    }
}
