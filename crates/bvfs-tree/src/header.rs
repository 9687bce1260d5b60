//! Header block: enumerated `Key: value` metadata for one filesystem
//!
//! Export layout:
//! ```text
//! FileSystem-Version: 1.0
//! Use-Encryption: true
//! Encryption-Salt: 9f3c...          (hex, 16 bytes)
//! Encryption-Key-Hash: 5ba2...      (hex SHA-256 of passphrase + app salt)
//! Description: holiday photos
//! Creation-Date: 1724800000000
//! Tags: photos,2026
//! ```
//! Keys always serialize in enumeration order; unset keys are omitted.

use bvfs_core::{BvfsError, BvfsResult};
use bvfs_crypto::{EncryptionContext, SALT_SIZE};
use indexmap::IndexMap;

use crate::epoch_millis_now;

/// Current on-disk filesystem format version.
pub const FILESYSTEM_VERSION: &str = "1.0";

/// The fixed, ordered header key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    FileSystemVersion,
    UseEncryption,
    EncryptionSalt,
    EncryptionKeyHash,
    Description,
    CreationDate,
    Tags,
}

impl HeaderKey {
    /// Enumeration order, which is also serialization order.
    pub const ALL: [Self; 7] = [
        Self::FileSystemVersion,
        Self::UseEncryption,
        Self::EncryptionSalt,
        Self::EncryptionKeyHash,
        Self::Description,
        Self::CreationDate,
        Self::Tags,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileSystemVersion => "FileSystem-Version",
            Self::UseEncryption => "Use-Encryption",
            Self::EncryptionSalt => "Encryption-Salt",
            Self::EncryptionKeyHash => "Encryption-Key-Hash",
            Self::Description => "Description",
            Self::CreationDate => "Creation-Date",
            Self::Tags => "Tags",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Ordered mapping from [`HeaderKey`] to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    values: IndexMap<HeaderKey, String>,
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard header for a freshly initialized encrypted filesystem:
    /// version, encryption flag, salt, verification hash and creation date.
    pub fn new_for_context(ctx: &EncryptionContext) -> Self {
        let mut block = Self::new();
        block.set(HeaderKey::FileSystemVersion, FILESYSTEM_VERSION);
        block.set(HeaderKey::UseEncryption, "true");
        block.set(HeaderKey::EncryptionSalt, hex::encode(ctx.salt()));
        block.set(HeaderKey::EncryptionKeyHash, ctx.verification_hash());
        block.set(HeaderKey::CreationDate, epoch_millis_now().to_string());
        block
    }

    pub fn get(&self, key: HeaderKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: HeaderKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// The persisted KDF salt, hex-decoded.
    pub fn encryption_salt(&self) -> BvfsResult<Option<[u8; SALT_SIZE]>> {
        let Some(hex_salt) = self.get(HeaderKey::EncryptionSalt) else {
            return Ok(None);
        };
        let bytes = hex::decode(hex_salt)
            .map_err(|e| BvfsError::Format(format!("Encryption-Salt is not valid hex: {e}")))?;
        let salt: [u8; SALT_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            BvfsError::Format(format!(
                "Encryption-Salt must be {SALT_SIZE} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Some(salt))
    }

    pub fn set_tags(&mut self, tags: &[&str]) {
        self.set(HeaderKey::Tags, tags.join(","));
    }

    pub fn tags(&self) -> Vec<&str> {
        self.get(HeaderKey::Tags)
            .map(|t| t.split(',').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Serialize to `Key: value` lines in enumeration order (unset keys
    /// omitted), without the terminating blank line.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for key in HeaderKey::ALL {
            if let Some(value) = self.values.get(&key) {
                out.push_str(key.as_str());
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    /// Parse one `Key: value` line. Unknown keys fail; the key set is fixed.
    pub fn parse_line(&mut self, line: &str) -> BvfsResult<()> {
        let (raw_key, raw_value) = line.split_once(':').ok_or_else(|| {
            BvfsError::Format(format!("malformed header line {line:?} (missing ':')"))
        })?;
        let key = HeaderKey::parse(raw_key.trim()).ok_or_else(|| {
            BvfsError::Format(format!("unknown header key {:?}", raw_key.trim()))
        })?;
        self.set(key, raw_value.trim());
        Ok(())
    }
}
