//! Download stream: lazy, ordered, decrypted chunk sequence with retry
//!
//! Given a manifest and an AEAD key, each pull fetches the next chunk's
//! ciphertext, decrypts it with that chunk's IV, and emits the plaintext.
//! Strictly one chunk at a time in manifest order: memory stays bounded and
//! output ordering is deterministic. Forward-only, non-restartable.

use bvfs_core::{BvfsError, BvfsResult, TransferConfig};
use bvfs_crypto::{decrypt, AeadKey};
use tracing::{debug, warn};

use crate::manifest::Manifest;
use crate::storage::BlobStore;

pub struct DownloadStream<'a, S: BlobStore> {
    store: &'a S,
    key: &'a AeadKey,
    manifest: Manifest,
    transfer: TransferConfig,
    cursor: usize,
    total_bytes: u64,
    current_bytes: u64,
    failed: bool,
}

impl<'a, S: BlobStore> DownloadStream<'a, S> {
    pub fn new(
        store: &'a S,
        key: &'a AeadKey,
        manifest: Manifest,
        transfer: TransferConfig,
    ) -> Self {
        let total_bytes = manifest.total_size();
        Self {
            store,
            key,
            manifest,
            transfer,
            cursor: 0,
            total_bytes,
            current_bytes: 0,
            failed: false,
        }
    }

    /// Sum of the manifest's declared ciphertext sizes, known up front.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Running total of decrypted bytes emitted so far.
    pub fn current_bytes(&self) -> u64 {
        self.current_bytes
    }

    /// Pull the next decrypted chunk, or `None` once the sequence has
    /// terminated (all chunks emitted, or a previous pull failed).
    ///
    /// A fetch failure is retried up to the configured attempt budget with a
    /// linear backoff (`attempt × backoff base`); exhausting it fails the
    /// whole stream with `TransferFailure` and no further chunks are
    /// fetched. An AEAD authentication failure is permanent for the chunk
    /// and fails the stream immediately — retrying with the same key cannot
    /// succeed.
    pub async fn next_chunk(&mut self) -> Option<BvfsResult<Vec<u8>>> {
        if self.failed || self.cursor >= self.manifest.len() {
            return None;
        }
        let index = self.cursor;
        let chunk = self.manifest.chunks()[index].clone();

        let mut attempt = 1u32;
        loop {
            let result = match self.store.fetch(&chunk.reference).await {
                Ok(ciphertext) => decrypt(&ciphertext, &chunk.iv, self.key),
                Err(e) => Err(e),
            };
            match result {
                Ok(plaintext) => {
                    self.cursor += 1;
                    self.current_bytes += plaintext.len() as u64;
                    debug!(
                        chunk = index,
                        bytes = plaintext.len(),
                        current_bytes = self.current_bytes,
                        "chunk decrypted"
                    );
                    return Some(Ok(plaintext));
                }
                Err(e @ BvfsError::AuthenticationFailure(_)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                Err(e) if attempt < self.transfer.max_attempts => {
                    warn!(
                        chunk = index,
                        attempt,
                        error = %e,
                        "chunk transfer failed, backing off"
                    );
                    tokio::time::sleep(self.transfer.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(BvfsError::TransferFailure(format!(
                        "chunk {index}: {attempt} attempts exhausted, last error: {e}"
                    ))));
                }
            }
        }
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn read_to_end(&mut self) -> BvfsResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobStore;
    use crate::upload::UploadStream;
    use bvfs_crypto::{AeadKey, KEY_SIZE};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_key() -> AeadKey {
        AeadKey::from_bytes([9u8; KEY_SIZE])
    }

    fn fast_transfer() -> TransferConfig {
        TransferConfig {
            backoff_base_secs: 0,
            ..TransferConfig::default()
        }
    }

    async fn upload(store: &MemoryBlobStore, key: &AeadKey, data: &[u8], max: usize) -> Manifest {
        let mut stream = UploadStream::new(store, key, "f", max);
        stream.write(data).await.unwrap();
        stream.close().await.unwrap().manifest
    }

    /// Delegates to a memory store, failing the first `fail_n` fetches.
    struct FlakyStore {
        inner: MemoryBlobStore,
        fail_n: u32,
        fetches: AtomicU32,
    }

    impl FlakyStore {
        fn new(inner: MemoryBlobStore, fail_n: u32) -> Self {
            Self {
                inner,
                fail_n,
                fetches: AtomicU32::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::Relaxed)
        }
    }

    impl BlobStore for FlakyStore {
        async fn store(&self, label: &str, bytes: &[u8]) -> BvfsResult<String> {
            self.inner.store(label, bytes).await
        }

        async fn fetch(&self, reference: &str) -> BvfsResult<Vec<u8>> {
            let n = self.fetches.fetch_add(1, Ordering::Relaxed);
            if n < self.fail_n {
                return Err(BvfsError::Storage("transient backend error".into()));
            }
            self.inner.fetch(reference).await
        }
    }

    #[tokio::test]
    async fn test_roundtrip_abc() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let manifest = upload(&store, &key, b"abc", 1024).await;
        let recorded_size = manifest.chunks()[0].size;

        let mut download = DownloadStream::new(&store, &key, manifest, fast_transfer());
        assert_eq!(download.total_bytes(), recorded_size);
        assert_eq!(download.current_bytes(), 0);

        assert_eq!(download.read_to_end().await.unwrap(), b"abc");
        assert_eq!(download.current_bytes(), 3);
        assert!(download.next_chunk().await.is_none(), "sequence terminated");
    }

    #[tokio::test]
    async fn test_multi_chunk_ordered_emission() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let data: Vec<u8> = (0..=255u8).cycle().take(100).collect();

        // Write in small pieces so the manifest gets several chunks
        let mut up = UploadStream::new(&store, &key, "f", 24);
        for piece in data.chunks(10) {
            up.write(piece).await.unwrap();
        }
        let manifest = up.close().await.unwrap().manifest;
        assert!(manifest.len() > 1);

        let mut down = DownloadStream::new(&store, &key, manifest, fast_transfer());
        assert_eq!(down.read_to_end().await.unwrap(), data);
        assert_eq!(down.current_bytes(), data.len() as u64);
    }

    #[tokio::test]
    async fn test_empty_manifest_terminates_immediately() {
        let store = MemoryBlobStore::new();
        let key = test_key();

        let mut down = DownloadStream::new(&store, &key, Manifest::new(), fast_transfer());
        assert_eq!(down.total_bytes(), 0);
        assert!(down.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let inner = MemoryBlobStore::new();
        let key = test_key();
        let manifest = upload(&inner, &key, b"persistent payload", 1024).await;

        let store = FlakyStore::new(inner, 2);
        let mut down = DownloadStream::new(&store, &key, manifest, fast_transfer());

        let chunk = down.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, b"persistent payload");
        assert_eq!(store.fetch_count(), 3, "two failures plus the success");
    }

    #[tokio::test]
    async fn test_retry_exhaustion_kills_stream() {
        let inner = MemoryBlobStore::new();
        let key = test_key();
        // Two chunks so we can show the second is never fetched
        let mut up = UploadStream::new(&inner, &key, "f", 4);
        up.write(b"123456").await.unwrap();
        up.write(b"789").await.unwrap();
        let manifest = up.close().await.unwrap().manifest;
        assert_eq!(manifest.len(), 2);

        let store = FlakyStore::new(inner, u32::MAX);
        let mut down = DownloadStream::new(&store, &key, manifest, fast_transfer());

        let result = down.next_chunk().await.unwrap();
        assert!(matches!(result, Err(BvfsError::TransferFailure(_))));
        assert_eq!(store.fetch_count(), 3, "exactly the attempt budget");

        assert!(down.next_chunk().await.is_none(), "stream is dead");
        assert_eq!(store.fetch_count(), 3, "no further chunks are fetched");
    }

    #[tokio::test]
    async fn test_wrong_key_fails_without_retry() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let manifest = upload(&store, &key, b"secret", 1024).await;

        let wrong = AeadKey::from_bytes([1u8; KEY_SIZE]);
        let mut down = DownloadStream::new(&store, &wrong, manifest, fast_transfer());

        let result = down.next_chunk().await.unwrap();
        assert!(matches!(
            result,
            Err(BvfsError::AuthenticationFailure(_))
        ));
        assert!(down.next_chunk().await.is_none());
    }
}
