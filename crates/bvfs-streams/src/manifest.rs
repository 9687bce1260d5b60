//! Chunk manifest: the ordered chunk list for one file
//!
//! Wire format (tab-separated text):
//! ```text
//! index	size	iv	link
//! 0	7999984	0f1e2d3c4b5a69788796a5b4	mem-17
//! 1	104876	a1b2c3d4e5f60718293a4b5c	mem-18
//! ```
//! Row order is chunk order. The `index` column is advisory and must match
//! the row position; `iv` is 24 lowercase hex characters (12 bytes); `link`
//! is the opaque storage reference of the ciphertext blob.

use bvfs_core::{BvfsError, BvfsResult};
use bvfs_crypto::IV_SIZE;

use crate::storage::BlobStore;

const COLUMNS: &str = "index\tsize\tiv\tlink";

/// One encrypted, independently stored unit of a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Ciphertext length in bytes
    pub size: u64,
    /// Per-chunk random IV (never reused under the same key)
    pub iv: [u8; IV_SIZE],
    /// Opaque storage reference of the ciphertext blob
    pub reference: String,
}

/// The ordered chunk list of one file. Concatenating the chunks' decrypted
/// payloads in order reconstructs the file. Immutable once written; files
/// change only by whole-file replace at the tree level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    chunks: Vec<Chunk>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of declared ciphertext sizes, known without fetching anything.
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.size).sum()
    }

    /// Serialize to the tab-separated wire format.
    pub fn encode(&self) -> String {
        let mut out = String::from(COLUMNS);
        out.push('\n');
        for (index, chunk) in self.chunks.iter().enumerate() {
            out.push_str(&format!(
                "{index}\t{}\t{}\t{}\n",
                chunk.size,
                hex::encode(chunk.iv),
                chunk.reference
            ));
        }
        out
    }

    /// Parse the wire format, checking the header row and that every `index`
    /// matches its row position.
    pub fn decode(input: &str) -> BvfsResult<Self> {
        let mut lines = input.lines();
        let columns = lines
            .next()
            .ok_or_else(|| BvfsError::Format("empty manifest".into()))?;
        if columns != COLUMNS {
            return Err(BvfsError::Format(format!(
                "bad manifest column row {columns:?}"
            )));
        }

        let mut chunks = Vec::new();
        for (position, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let index: usize = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| BvfsError::Format(format!("manifest row {line:?}: bad index")))?;
            if index != position {
                return Err(BvfsError::Format(format!(
                    "manifest row {position}: index column says {index}"
                )));
            }
            let size: u64 = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| BvfsError::Format(format!("manifest row {line:?}: bad size")))?;
            let iv_hex = fields
                .next()
                .ok_or_else(|| BvfsError::Format(format!("manifest row {line:?}: missing iv")))?;
            let iv_bytes = hex::decode(iv_hex)
                .map_err(|e| BvfsError::Format(format!("manifest row {line:?}: bad iv hex: {e}")))?;
            let iv: [u8; IV_SIZE] = iv_bytes.try_into().map_err(|b: Vec<u8>| {
                BvfsError::Format(format!(
                    "manifest row {line:?}: iv must be {IV_SIZE} bytes, got {}",
                    b.len()
                ))
            })?;
            let reference = fields
                .next()
                .filter(|r| !r.is_empty())
                .ok_or_else(|| BvfsError::Format(format!("manifest row {line:?}: missing link")))?;
            if fields.next().is_some() {
                return Err(BvfsError::Format(format!(
                    "manifest row {line:?}: too many fields"
                )));
            }
            chunks.push(Chunk {
                size,
                iv,
                reference: reference.to_string(),
            });
        }
        Ok(Self { chunks })
    }
}

/// Persist a manifest as its own blob; the returned reference is what a file
/// node records as its `manifest_ref`.
pub async fn store_manifest(
    store: &impl BlobStore,
    label: &str,
    manifest: &Manifest,
) -> BvfsResult<String> {
    store.store(label, manifest.encode().as_bytes()).await
}

/// Fetch and decode a manifest blob by reference.
pub async fn load_manifest(store: &impl BlobStore, reference: &str) -> BvfsResult<Manifest> {
    let bytes = store.fetch(reference).await?;
    let text = String::from_utf8(bytes)
        .map_err(|_| BvfsError::Format("manifest blob is not UTF-8".into()))?;
    Manifest::decode(&text)
}
