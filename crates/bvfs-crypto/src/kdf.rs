//! Key derivation: PBKDF2-HMAC-SHA256 passphrase → AEAD key

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::{APP_SALT, KEY_SIZE, SALT_SIZE};

/// A 256-bit AES-GCM key derived from a passphrase.
///
/// Zeroized on drop to prevent secrets lingering in memory. Never persisted;
/// restores re-derive it from (passphrase, salt).
#[derive(Clone)]
pub struct AeadKey {
    bytes: [u8; KEY_SIZE],
}

impl AeadKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for AeadKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A caller-supplied passphrase.
///
/// There is no ambient default: code that wants the well-known insecure
/// passphrase must opt in through [`Passphrase::insecure_default`].
#[derive(Clone)]
pub struct Passphrase {
    secret: SecretString,
}

/// The documented insecure default passphrase. Anyone with a copy of this
/// source can decrypt filesystems created with it.
const INSECURE_DEFAULT_PASSPHRASE: &str = "blobvault-insecure-default";

impl Passphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(passphrase.into()),
        }
    }

    /// The well-known default passphrase, for callers that explicitly accept
    /// zero confidentiality (e.g. throwaway test filesystems).
    pub fn insecure_default() -> Self {
        Self::new(INSECURE_DEFAULT_PASSPHRASE)
    }

    pub(crate) fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passphrase")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Derive the 256-bit AEAD key from a passphrase and the per-filesystem salt
/// using PBKDF2-HMAC-SHA256.
///
/// Deterministic in (passphrase, salt, iterations): restoring a filesystem
/// must reproduce the exact key or existing chunks become unreadable.
pub fn derive_key(passphrase: &Passphrase, salt: &[u8; SALT_SIZE], iterations: u32) -> AeadKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.expose().as_bytes(), salt, iterations, &mut key);
    AeadKey::from_bytes(key)
}

/// Hex-encoded SHA-256 of `passphrase || APP_SALT`.
///
/// Stored in the `Encryption-Key-Hash` header and compared on restore to
/// detect a wrong passphrase early. Never used to derive the AEAD key.
pub fn passphrase_hash(passphrase: &Passphrase) -> String {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.expose().as_bytes());
    hasher.update(APP_SALT.as_bytes());
    hex::encode(hasher.finalize())
}
