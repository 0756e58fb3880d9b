//! Object storage for compressed backup blobs
//!
//! The backup manager only needs five primitives from a bucket-style store:
//! obtain an upload target, upload a blob, download a blob by name, list blobs
//! under a prefix and delete a specific blob version.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{VaultError, VaultResult};

/// Authorization to upload one blob into a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    pub token: String,
}

/// Metadata for one stored blob version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Identifies this version; required to delete it
    pub file_id: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub content_sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A bucket-style blob store
pub trait ObjectStore: Send + Sync {
    /// Bucket this store writes into
    fn bucket(&self) -> &str;

    fn upload_target(&self) -> VaultResult<UploadTarget>;

    /// Store `data` under `file_name`; `content_sha256` must match the payload
    fn upload(
        &self,
        target: &UploadTarget,
        file_name: &str,
        data: &[u8],
        content_sha256: &str,
    ) -> VaultResult<StoredObject>;

    fn download_by_name(&self, file_name: &str) -> VaultResult<Vec<u8>>;

    /// Objects whose name starts with `prefix`, ordered by name
    fn list_by_prefix(&self, prefix: &str, max_count: usize) -> VaultResult<Vec<StoredObject>>;

    fn delete_version(&self, file_id: &str, file_name: &str) -> VaultResult<()>;
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Shared upload checks: the target belongs to this bucket and the hash matches
fn verify_upload(
    bucket: &str,
    target: &UploadTarget,
    file_name: &str,
    data: &[u8],
    content_sha256: &str,
) -> VaultResult<()> {
    if target.bucket != bucket {
        return Err(VaultError::ObjectStore(format!(
            "Upload target is for bucket {}, not {}",
            target.bucket, bucket
        )));
    }
    if file_name.is_empty() || file_name.starts_with('/') || file_name.contains("..") {
        return Err(VaultError::ObjectStore(format!(
            "Invalid object name: {}",
            file_name
        )));
    }
    let actual = sha256_hex(data);
    if !actual.eq_ignore_ascii_case(content_sha256) {
        return Err(VaultError::ObjectStore(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            file_name, content_sha256, actual
        )));
    }
    Ok(())
}

fn object_missing(file_name: &str) -> VaultError {
    VaultError::ObjectStore(format!("Object not found: {}", file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_upload_rejects_bad_hash() {
        let target = UploadTarget {
            bucket: "b".into(),
            token: "t".into(),
        };
        let err = verify_upload("b", &target, "x.gz", b"data", "00").unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_verify_upload_rejects_foreign_bucket() {
        let target = UploadTarget {
            bucket: "other".into(),
            token: "t".into(),
        };
        let hash = sha256_hex(b"data");
        assert!(verify_upload("b", &target, "x.gz", b"data", &hash).is_err());
    }

    #[test]
    fn test_verify_upload_rejects_escaping_names() {
        let target = UploadTarget {
            bucket: "b".into(),
            token: "t".into(),
        };
        let hash = sha256_hex(b"data");
        assert!(verify_upload("b", &target, "../x.gz", b"data", &hash).is_err());
        assert!(verify_upload("b", &target, "/abs.gz", b"data", &hash).is_err());
    }
}
