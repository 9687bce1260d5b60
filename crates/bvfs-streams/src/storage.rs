//! Blob store collaborator contract
//!
//! The core never talks to a network itself; it consumes a capability that
//! can persist a named byte blob and fetch it back by an opaque reference.
//! Backend-specific concerns (auth, rate limiting, transport retries beyond
//! the documented download retry) live behind this trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bvfs_core::{BvfsError, BvfsResult};

/// The storage collaborator: `store` persists bytes under a human-meaningful
/// label and returns an opaque reference; `fetch` resolves a reference back
/// to bytes. References are string tokens the core never interprets.
pub trait BlobStore {
    fn store(
        &self,
        label: &str,
        bytes: &[u8],
    ) -> impl Future<Output = BvfsResult<String>> + Send;

    fn fetch(&self, reference: &str) -> impl Future<Output = BvfsResult<Vec<u8>>> + Send;
}

/// In-memory [`BlobStore`]: reference = `mem-<counter>`. Useful for tests and
/// for exercising the pipeline without a backend.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().expect("blob map poisoned").len()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn store(&self, _label: &str, bytes: &[u8]) -> BvfsResult<String> {
        let reference = format!("mem-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.blobs
            .lock()
            .expect("blob map poisoned")
            .insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn fetch(&self, reference: &str) -> BvfsResult<Vec<u8>> {
        self.blobs
            .lock()
            .expect("blob map poisoned")
            .get(reference)
            .cloned()
            .ok_or_else(|| BvfsError::Storage(format!("no blob for reference {reference:?}")))
    }
}
