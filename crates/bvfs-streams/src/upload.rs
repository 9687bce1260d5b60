//! Upload stream: buffer to the chunk boundary, encrypt, store, accumulate
//! the manifest
//!
//! States: Open → (buffering ⇄ flushing)* → Done (via `close`), or Aborted.
//! Consumption is sequential: a write that crosses the chunk boundary awaits
//! the flush before the buffer is reused, so at most one store call is ever
//! in flight and memory stays bounded to roughly one chunk.

use bvfs_core::{BvfsError, BvfsResult};
use bvfs_crypto::{encrypt, generate_iv, AeadKey};
use tracing::{debug, warn};

use crate::manifest::{Chunk, Manifest};
use crate::storage::BlobStore;

/// Returned by [`UploadStream::close`] once the final flush has completed;
/// this is the integration point where the caller registers the new file
/// node. The manifest is fully flushed before this value exists.
#[derive(Debug)]
pub struct UploadSummary {
    pub manifest: Manifest,
    /// Total ciphertext bytes stored across all chunks
    pub total_bytes: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Open,
    Aborted,
}

pub struct UploadStream<'a, S: BlobStore> {
    store: &'a S,
    key: &'a AeadKey,
    /// Label prefix for stored chunk blobs (`<label>.<index>`)
    label: String,
    max_chunk_size: usize,
    fragments: Vec<Vec<u8>>,
    buffered: usize,
    manifest: Manifest,
    total_bytes: u64,
    state: State,
}

impl<'a, S: BlobStore> UploadStream<'a, S> {
    pub fn new(store: &'a S, key: &'a AeadKey, label: impl Into<String>, max_chunk_size: usize) -> Self {
        Self {
            store,
            key,
            label: label.into(),
            max_chunk_size,
            fragments: Vec::new(),
            buffered: 0,
            manifest: Manifest::new(),
            total_bytes: 0,
            state: State::Open,
        }
    }

    /// Ciphertext bytes stored so far.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn chunk_count(&self) -> usize {
        self.manifest.len()
    }

    /// Append `bytes` to the stream. If the payload no longer fits in the
    /// current buffer, the buffer is flushed as one chunk first and the whole
    /// payload starts the next buffer — a single write larger than the chunk
    /// size is never split and legitimately produces an oversized chunk.
    pub async fn write(&mut self, bytes: &[u8]) -> BvfsResult<()> {
        self.check_open()?;
        if self.buffered + bytes.len() > self.max_chunk_size {
            self.flush().await?;
        }
        self.buffered += bytes.len();
        self.fragments.push(bytes.to_vec());
        Ok(())
    }

    /// Final flush (even with an empty buffer, so an untouched stream closes
    /// to a well-formed empty manifest), then hand over the finished
    /// manifest and total byte count.
    pub async fn close(mut self) -> BvfsResult<UploadSummary> {
        self.check_open()?;
        self.flush().await?;
        debug!(
            label = %self.label,
            chunks = self.manifest.len(),
            total_bytes = self.total_bytes,
            "upload stream closed"
        );
        Ok(UploadSummary {
            manifest: self.manifest,
            total_bytes: self.total_bytes,
        })
    }

    /// Discard the buffer and poison the stream. Chunks that were already
    /// flushed are not retracted; the orphaned blobs stay in the backend
    /// (garbage collection is out of scope).
    pub fn abort(&mut self, reason: &str) {
        warn!(
            label = %self.label,
            reason,
            flushed_chunks = self.manifest.len(),
            "upload aborted; already-flushed chunks are not retracted"
        );
        self.fragments.clear();
        self.buffered = 0;
        self.state = State::Aborted;
    }

    fn check_open(&self) -> BvfsResult<()> {
        match self.state {
            State::Open => Ok(()),
            State::Aborted => Err(BvfsError::invalid_operation(
                "upload stream has been aborted",
            )),
        }
    }

    /// Encrypt the buffered fragments as one chunk and persist it. A store
    /// failure is fatal: the stream is poisoned and no partial manifest is
    /// ever published.
    async fn flush(&mut self) -> BvfsResult<()> {
        if self.fragments.is_empty() {
            return Ok(());
        }

        let plaintext = if self.fragments.len() == 1 {
            self.fragments.pop().unwrap_or_default()
        } else {
            let mut joined = Vec::with_capacity(self.buffered);
            for fragment in self.fragments.drain(..) {
                joined.extend_from_slice(&fragment);
            }
            joined
        };
        let plaintext_len = plaintext.len();
        self.buffered = 0;

        let index = self.manifest.len();
        let iv = generate_iv();
        let ciphertext = encrypt(&plaintext, &iv, self.key)?;

        let chunk_label = format!("{}.{index}", self.label);
        let reference = match self.store.store(&chunk_label, &ciphertext).await {
            Ok(reference) => reference,
            Err(e) => {
                self.state = State::Aborted;
                return Err(BvfsError::TransferFailure(format!(
                    "storing chunk {index} of {:?}: {e}",
                    self.label
                )));
            }
        };

        let size = ciphertext.len() as u64;
        debug!(
            label = %self.label,
            chunk = index,
            plaintext_bytes = plaintext_len,
            ciphertext_bytes = size,
            reference = %reference,
            "flushed chunk"
        );
        self.total_bytes += size;
        self.manifest.push(Chunk {
            size,
            iv,
            reference,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobStore;
    use bvfs_crypto::{decrypt, AeadKey, KEY_SIZE, TAG_SIZE};

    fn test_key() -> AeadKey {
        AeadKey::from_bytes([7u8; KEY_SIZE])
    }

    async fn decrypt_all(store: &MemoryBlobStore, manifest: &Manifest, key: &AeadKey) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in manifest.chunks() {
            let ciphertext = store.fetch(&chunk.reference).await.unwrap();
            out.extend_from_slice(&decrypt(&ciphertext, &chunk.iv, key).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_single_small_write() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let mut stream = UploadStream::new(&store, &key, "f", 1024);

        stream.write(b"abc").await.unwrap();
        let summary = stream.close().await.unwrap();

        assert_eq!(summary.manifest.len(), 1);
        let chunk = &summary.manifest.chunks()[0];
        assert_eq!(chunk.size, (3 + TAG_SIZE) as u64);
        assert_eq!(summary.total_bytes, chunk.size);

        assert_eq!(decrypt_all(&store, &summary.manifest, &key).await, b"abc");
    }

    #[tokio::test]
    async fn test_empty_close_yields_empty_manifest() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let stream = UploadStream::new(&store, &key, "f", 1024);

        let summary = stream.close().await.unwrap();
        assert!(summary.manifest.is_empty());
        assert_eq!(summary.total_bytes, 0);
        assert_eq!(store.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_boundary_crossing_write_flushes_first() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let mut stream = UploadStream::new(&store, &key, "f", 10);

        stream.write(b"12345").await.unwrap();
        stream.write(b"67890").await.unwrap(); // exactly fills the buffer
        assert_eq!(stream.chunk_count(), 0, "no flush until the boundary is crossed");

        stream.write(b"next").await.unwrap(); // crosses: flushes "1234567890"
        assert_eq!(stream.chunk_count(), 1);

        let summary = stream.close().await.unwrap();
        assert_eq!(summary.manifest.len(), 2);
        assert_eq!(
            decrypt_all(&store, &summary.manifest, &key).await,
            b"1234567890next"
        );
    }

    #[tokio::test]
    async fn test_oversized_write_is_not_split() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let mut stream = UploadStream::new(&store, &key, "f", 8);

        let big = vec![0xAB; 100];
        stream.write(&big).await.unwrap();
        let summary = stream.close().await.unwrap();

        assert_eq!(summary.manifest.len(), 1, "oversized write stays one chunk");
        assert_eq!(summary.manifest.chunks()[0].size, (100 + TAG_SIZE) as u64);
        assert_eq!(decrypt_all(&store, &summary.manifest, &key).await, big);
    }

    #[tokio::test]
    async fn test_multi_chunk_reassembly() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let mut stream = UploadStream::new(&store, &key, "f", 16);

        let mut expected = Vec::new();
        for i in 0u8..10 {
            let payload = vec![i; 7];
            expected.extend_from_slice(&payload);
            stream.write(&payload).await.unwrap();
        }
        let summary = stream.close().await.unwrap();

        assert!(summary.manifest.len() > 1, "70 bytes at 16/chunk must split");
        assert_eq!(decrypt_all(&store, &summary.manifest, &key).await, expected);

        // Fresh IV per chunk
        let chunks = summary.manifest.chunks();
        for (i, a) in chunks.iter().enumerate() {
            for b in &chunks[i + 1..] {
                assert_ne!(a.iv, b.iv, "IVs must be unique per chunk");
            }
        }
    }

    #[tokio::test]
    async fn test_abort_poisons_stream() {
        let store = MemoryBlobStore::new();
        let key = test_key();
        let mut stream = UploadStream::new(&store, &key, "f", 4);

        stream.write(b"123456").await.unwrap(); // no flush yet (first write)
        stream.write(b"78").await.unwrap(); // flushes "123456"
        assert_eq!(stream.chunk_count(), 1);

        stream.abort("caller cancelled");
        assert!(matches!(
            stream.write(b"more").await,
            Err(BvfsError::InvalidOperation(_))
        ));
        assert!(matches!(
            stream.close().await,
            Err(BvfsError::InvalidOperation(_))
        ));

        // The already-flushed chunk stays in the backend
        assert_eq!(store.blob_count(), 1);
    }

    struct FailingStore;

    impl BlobStore for FailingStore {
        async fn store(&self, _label: &str, _bytes: &[u8]) -> BvfsResult<String> {
            Err(BvfsError::Storage("backend unavailable".into()))
        }

        async fn fetch(&self, _reference: &str) -> BvfsResult<Vec<u8>> {
            Err(BvfsError::Storage("backend unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let store = FailingStore;
        let key = test_key();
        let mut stream = UploadStream::new(&store, &key, "f", 4);

        stream.write(b"123456").await.unwrap();
        let result = stream.write(b"trigger flush").await;
        assert!(matches!(result, Err(BvfsError::TransferFailure(_))));

        // Stream is poisoned; no partial manifest is published
        assert!(matches!(
            stream.write(b"x").await,
            Err(BvfsError::InvalidOperation(_))
        ));
    }
}
