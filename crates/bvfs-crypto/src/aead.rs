//! AES-256-GCM encrypt/decrypt of opaque byte blocks
//!
//! The IV is *not* embedded in the ciphertext: the chunk manifest records it
//! alongside the storage reference, so `encrypt` returns bare
//! `ciphertext || tag` and `decrypt` expects the same.
//!
//! IV reuse under one key breaks GCM confidentiality, so every encryption
//! must use a fresh value from [`generate_iv`].

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use bvfs_core::{BvfsError, BvfsResult};
use rand::RngCore;

use crate::kdf::AeadKey;
use crate::{IV_SIZE, SALT_SIZE};

/// Generate a fresh random 96-bit IV.
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// Generate a fresh random per-filesystem KDF salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Encrypt one block with AES-256-GCM.
///
/// Returns `ciphertext || 16-byte tag` (IV travels separately in the manifest).
pub fn encrypt(plaintext: &[u8], iv: &[u8; IV_SIZE], key: &AeadKey) -> BvfsResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(iv);

    cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| BvfsError::Other(anyhow::anyhow!("chunk encryption failed: {e}")))
}

/// Decrypt one block with AES-256-GCM.
///
/// Fails with [`BvfsError::AuthenticationFailure`] if the tag does not verify
/// (tampered or wrong-key ciphertext). Callers must treat this as permanent
/// for the chunk, never as a retryable transfer error.
pub fn decrypt(ciphertext: &[u8], iv: &[u8; IV_SIZE], key: &AeadKey) -> BvfsResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(iv);

    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        BvfsError::AuthenticationFailure(
            "chunk decryption failed: invalid key or corrupted ciphertext".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{derive_key, Passphrase};
    use crate::{KEY_SIZE, TAG_SIZE};

    fn test_key() -> AeadKey {
        AeadKey::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let iv = generate_iv();
        let plaintext = b"hello, encrypted world!";

        let ciphertext = encrypt(plaintext, &iv, &key).unwrap();
        let decrypted = decrypt(&ciphertext, &iv, &key).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = test_key();
        let iv = generate_iv();

        let ciphertext = encrypt(b"", &iv, &key).unwrap();
        assert_eq!(ciphertext.len(), TAG_SIZE, "empty plaintext leaves only the tag");

        let decrypted = decrypt(&ciphertext, &iv, &key).unwrap();
        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_ciphertext_size() {
        let key = test_key();
        let iv = generate_iv();
        let plaintext = vec![0u8; 1000];

        let ciphertext = encrypt(&plaintext, &iv, &key).unwrap();
        assert_eq!(ciphertext.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let iv = generate_iv();
        let ciphertext = encrypt(b"secret data", &iv, &test_key()).unwrap();

        let other = derive_key(&Passphrase::new("other"), &[0u8; SALT_SIZE], 1_000);
        let result = decrypt(&ciphertext, &iv, &other);

        assert!(matches!(
            result,
            Err(bvfs_core::BvfsError::AuthenticationFailure(_))
        ));
    }

    #[test]
    fn test_decrypt_wrong_iv() {
        let key = test_key();
        let iv = generate_iv();
        let ciphertext = encrypt(b"secret data", &iv, &key).unwrap();

        let mut wrong_iv = iv;
        wrong_iv[0] ^= 0x01;
        assert!(decrypt(&ciphertext, &wrong_iv, &key).is_err());
    }

    #[test]
    fn test_tampered_ciphertext() {
        let key = test_key();
        let iv = generate_iv();
        let plaintext = b"secret data";

        // Flipping any single byte must break tag verification.
        let ciphertext = encrypt(plaintext, &iv, &key).unwrap();
        for i in 0..ciphertext.len() {
            let mut tampered = ciphertext.clone();
            tampered[i] ^= 0xFF;
            assert!(
                decrypt(&tampered, &iv, &key).is_err(),
                "tampered byte {i} must fail authentication"
            );
        }
    }

    #[test]
    fn test_fresh_ivs_differ() {
        let a = generate_iv();
        let b = generate_iv();
        assert_ne!(a, b, "random IVs must differ");
    }

    proptest::proptest! {
        #[test]
        fn prop_roundtrip_arbitrary_bytes(data: Vec<u8>) {
            let key = test_key();
            let iv = generate_iv();
            let ciphertext = encrypt(&data, &iv, &key).unwrap();
            let decrypted = decrypt(&ciphertext, &iv, &key).unwrap();
            proptest::prop_assert_eq!(decrypted, data);
        }
    }
}
