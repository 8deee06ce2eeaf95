//! In-memory [`BlobStore`] for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{BlobStore, StorageError};

/// Blob store kept in memory, recording every upload. Uploads to names
/// registered with [`MemoryStore::rejecting`] fail with HTTP 403.
#[derive(Default)]
pub(crate) struct MemoryStore {
    blobs: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    uploads: Mutex<usize>,
    rejected: BTreeSet<String>,
}

impl MemoryStore {
    pub(crate) fn rejecting(names: &[&str]) -> Self {
        Self {
            rejected: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<(Vec<u8>, String)> {
        self.blobs.lock().unwrap().get(name).cloned()
    }

    /// Upload attempts, including rejected ones.
    pub(crate) fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap()
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, (Vec<u8>, String)> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn list_blobs(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.blobs.lock().unwrap().keys().cloned().collect())
    }

    async fn download_blob(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        self.get(name)
            .map(|(data, _)| data)
            .ok_or_else(|| StorageError::Status {
                status: 404,
                operation: "download",
                resource: name.to_string(),
                message: "BlobNotFound".into(),
            })
    }

    async fn upload_blob(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        *self.uploads.lock().unwrap() += 1;
        if self.rejected.contains(name) {
            return Err(StorageError::Status {
                status: 403,
                operation: "upload",
                resource: name.to_string(),
                message: "AuthorizationFailure".into(),
            });
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    fn blob_url(&self, name: &str) -> String {
        format!("memory://photos/{name}")
    }
}
