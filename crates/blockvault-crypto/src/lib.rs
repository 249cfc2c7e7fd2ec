//! # blockvault-crypto
//!
//! The Encryption Engine: AES-256-GCM payload encryption with a random
//! 96-bit nonce carried as a ciphertext prefix, key generation, and one-way
//! key fingerprints. Raw key material never leaves this crate except through
//! [`EncryptionKey::to_base64`], which callers disclose exactly once.

pub mod engine;
pub mod key;

pub use engine::{EncryptionEngine, NONCE_LEN, TAG_LEN};
pub use key::{EncryptionKey, KEY_LEN, KeyFingerprint};
