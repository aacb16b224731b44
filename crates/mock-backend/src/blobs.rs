//! In-memory blob store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracker_core::{BlobStore, StoreError};

/// Blob store over a map. URLs are `mem://{key}`.
pub struct MemoryBlobs {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(BTreeMap::new()),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Make every upload fail with `StoreError::Unavailable`.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Stored bytes for a key, for test assertions.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().expect("lock poisoned").get(key).cloned()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBlobs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("blob upload rejected".to_string()));
        }
        self.blobs
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("mem://{}", key))
    }
}
