//! Encryption context: passphrase + persisted salt + derived AEAD key
//!
//! Created together with the filesystem tree, either fresh (random salt) or
//! restored (salt taken from the persisted export header). The derived key
//! lives only in memory.

use bvfs_core::{BvfsError, BvfsResult};
use tracing::debug;

use crate::aead::generate_salt;
use crate::kdf::{derive_key, passphrase_hash, AeadKey, Passphrase};
use crate::SALT_SIZE;

pub struct EncryptionContext {
    passphrase: Passphrase,
    salt: [u8; SALT_SIZE],
    key: AeadKey,
}

impl EncryptionContext {
    /// Initialize a fresh context with a newly generated salt.
    pub fn create(passphrase: Passphrase, iterations: u32) -> Self {
        let salt = generate_salt();
        debug!(salt = %hex::encode(salt), "initializing fresh encryption context");
        let key = derive_key(&passphrase, &salt, iterations);
        Self {
            passphrase,
            salt,
            key,
        }
    }

    /// Rebuild a context from the salt persisted in a filesystem export.
    ///
    /// The key is re-derived from (passphrase, persisted salt); a freshly
    /// generated salt here would make every existing chunk undecryptable.
    pub fn restore(passphrase: Passphrase, salt: [u8; SALT_SIZE], iterations: u32) -> Self {
        let key = derive_key(&passphrase, &salt, iterations);
        Self {
            passphrase,
            salt,
            key,
        }
    }

    pub fn key(&self) -> &AeadKey {
        &self.key
    }

    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    /// Hex hash stored in the `Encryption-Key-Hash` header.
    pub fn verification_hash(&self) -> String {
        passphrase_hash(&self.passphrase)
    }

    /// Compare this context's passphrase against a persisted verification
    /// hash. The persisted value is ground truth; a mismatch means the caller
    /// supplied the wrong passphrase.
    pub fn verify_against(&self, persisted_hash: &str) -> BvfsResult<()> {
        if self.verification_hash() == persisted_hash {
            Ok(())
        } else {
            Err(BvfsError::AuthenticationFailure(
                "passphrase does not match the filesystem's Encryption-Key-Hash".into(),
            ))
        }
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("salt", &hex::encode(self.salt))
            .field("key", &"[REDACTED]")
            .finish()
    }
}
