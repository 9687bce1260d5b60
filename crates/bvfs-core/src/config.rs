use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration (loaded from blobvault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BvfsConfig {
    pub crypto: CryptoConfig,
    pub transfer: TransferConfig,
}

/// Client-side encryption configuration.
///
/// The passphrase itself never lives in the config file; it is supplied by
/// the caller at filesystem init/restore time (see `bvfs-crypto`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Whether file content is encrypted before upload (default: true)
    pub use_encryption: bool,
    /// PBKDF2-HMAC-SHA256 iteration count (default: 100_000)
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            use_encryption: true,
            pbkdf2_iterations: 100_000,
        }
    }
}

/// Upload/download stream tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Plaintext bytes buffered per chunk before a flush is forced.
    /// The default keeps each ciphertext object (plaintext + 16-byte GCM tag)
    /// within an 8 MB per-object backend cap.
    pub max_chunk_size: usize,
    /// Total attempts per chunk fetch before the download fails (default: 3)
    pub max_attempts: u32,
    /// Backoff base between attempts; attempt N waits N x this (default: 10s)
    pub backoff_base_secs: u64,
}

impl TransferConfig {
    /// Backoff before retrying after `attempt` failed tries (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base_secs.saturating_mul(u64::from(attempt)))
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 8_000_000 - 16,
            max_attempts: 3,
            backoff_base_secs: 10,
        }
    }
}

impl BvfsConfig {
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).map_err(|e| anyhow::anyhow!("parsing config: {e}"))
    }
}
