//! bvfs-crypto: client-side encryption for blobvault
//!
//! Architecture: buffer-then-encrypt with AES-256-GCM
//!
//! Pipeline: plaintext chunk → AES-256-GCM (fresh 96-bit IV per chunk) → upload
//!
//! Key derivation:
//! ```text
//! AEAD Key (256-bit) = PBKDF2-HMAC-SHA256(passphrase, filesystem salt, 100k iterations)
//! Verification hash  = SHA-256(passphrase || APP_SALT)   — wrong-passphrase check only,
//!                                                          never used as key material
//! ```
//!
//! The filesystem salt is generated once per filesystem and persisted in the
//! export header; the AEAD key is re-derived from (passphrase, salt) on every
//! restore and never persisted.

pub mod aead;
pub mod context;
pub mod kdf;

pub use aead::{decrypt, encrypt, generate_iv, generate_salt};
pub use context::EncryptionContext;
pub use kdf::{derive_key, passphrase_hash, AeadKey, Passphrase};

/// Size of an AEAD key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM initialization vector (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the per-filesystem KDF salt
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Fixed application salt mixed into the passphrase-verification hash.
/// Distinct from the per-filesystem KDF salt; changing it invalidates every
/// stored `Encryption-Key-Hash` header.
pub const APP_SALT: &str = "blobvault/passphrase-check/v1";
