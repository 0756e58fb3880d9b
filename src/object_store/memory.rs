//! In-process object store with an availability switch

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use super::{object_missing, verify_upload, ObjectStore, StoredObject, UploadTarget};
use crate::error::{VaultError, VaultResult};

#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, (StoredObject, Vec<u8>)>>,
    available: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// While unavailable every operation fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> VaultResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VaultError::ObjectStore(format!(
                "Bucket {} is unavailable",
                self.bucket
            )))
        }
    }

    fn objects(&self) -> VaultResult<MutexGuard<'_, BTreeMap<String, (StoredObject, Vec<u8>)>>> {
        self.check_available()?;
        self.objects
            .lock()
            .map_err(|_| VaultError::ObjectStore("Lock poisoned".into()))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn upload_target(&self) -> VaultResult<UploadTarget> {
        self.check_available()?;
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
        let object = StoredObject {
            file_id: Uuid::new_v4().simple().to_string(),
            file_name: file_name.to_string(),
            size_bytes: data.len() as u64,
            content_sha256: content_sha256.to_ascii_lowercase(),
            uploaded_at: Utc::now().trunc_subsecs(6),
        };
        self.objects()?
            .insert(file_name.to_string(), (object.clone(), data.to_vec()));
        Ok(object)
    }

    fn download_by_name(&self, file_name: &str) -> VaultResult<Vec<u8>> {
        self.objects()?
            .get(file_name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| object_missing(file_name))
    }

    fn list_by_prefix(&self, prefix: &str, max_count: usize) -> VaultResult<Vec<StoredObject>> {
        Ok(self
            .objects()?
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .take(max_count)
            .map(|(_, (object, _))| object.clone())
            .collect())
    }

    fn delete_version(&self, file_id: &str, file_name: &str) -> VaultResult<()> {
        let mut objects = self.objects()?;
        match objects.get(file_name) {
            Some((object, _)) if object.file_id == file_id => {
                objects.remove(file_name);
                Ok(())
            }
            _ => Err(VaultError::ObjectStore(format!(
                "No version {} of {}",
                file_id, file_name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::sha256_hex;

    #[test]
    fn test_round_trip_and_delete() {
        let store = MemoryObjectStore::new("b");
        let target = store.upload_target().unwrap();
        let object = store
            .upload(&target, "f/a.gz", b"abc", &sha256_hex(b"abc"))
            .unwrap();

        assert_eq!(store.download_by_name("f/a.gz").unwrap(), b"abc");
        assert_eq!(store.list_by_prefix("f/a.gz", 1).unwrap(), vec![object.clone()]);

        store.delete_version(&object.file_id, "f/a.gz").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_unavailable_store_fails_everything() {
        let store = MemoryObjectStore::new("b");
        store.set_available(false);

        assert!(store.upload_target().is_err());
        assert!(store.download_by_name("f/a.gz").is_err());
        assert!(store.list_by_prefix("", 10).is_err());

        store.set_available(true);
        assert!(store.upload_target().is_ok());
    }

    #[test]
    fn test_prefix_listing_stops_at_prefix_end() {
        let store = MemoryObjectStore::new("b");
        let target = store.upload_target().unwrap();
        for name in ["a/1", "a/2", "b/1"] {
            store
                .upload(&target, name, name.as_bytes(), &sha256_hex(name.as_bytes()))
                .unwrap();
        }
        let listed = store.list_by_prefix("a/", 10).unwrap();
        assert_eq!(listed.len(), 2);
    }
}
