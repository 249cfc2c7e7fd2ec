//! AES-256-GCM payload encryption.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;

use crate::key::{EncryptionKey, KEY_LEN, KeyFingerprint};

/// Nonce length in bytes, prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes, appended by AES-GCM.
pub const TAG_LEN: usize = 16;

/// Stateless payload encryption engine.
///
/// Output layout is `nonce || ciphertext || tag`, so a ciphertext plus its
/// key is enough to decrypt.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptionEngine;

impl EncryptionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh random key from the OS RNG.
    pub fn generate_key(&self) -> EncryptionKey {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        EncryptionKey::from_bytes(bytes)
    }

    /// Encrypt `plaintext` under `key` with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8], key: &EncryptionKey) -> AppResult<Vec<u8>> {
        let cipher = cipher_for(key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| AppError::internal("Encryption failed"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext || tag` payload.
    ///
    /// A wrong key, a tampered payload, or a truncated payload all fail with
    /// `IntegrityError`; no partial plaintext is ever returned.
    pub fn decrypt(&self, payload: &[u8], key: &EncryptionKey) -> AppResult<Vec<u8>> {
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(AppError::integrity(
                "Ciphertext is too short to contain a nonce and tag",
            ));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);

        cipher_for(key)
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::integrity("Decryption failed: wrong key or tampered data"))
    }

    /// One-way fingerprint stored in place of the key.
    pub fn fingerprint(&self, key: &EncryptionKey) -> KeyFingerprint {
        KeyFingerprint::of(key)
    }
}

fn cipher_for(key: &EncryptionKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}
