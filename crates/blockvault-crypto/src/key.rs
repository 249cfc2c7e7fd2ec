//! Symmetric key material and its fingerprint.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// A 256-bit encryption key. Wiped from memory on drop.
///
/// `Debug` never prints the key bytes.
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a caller-supplied key: standard base64 of exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> AppResult<Self> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| AppError::validation("Encryption key is not valid base64"))?,
        );
        if decoded.len() != KEY_LEN {
            return Err(AppError::validation(format!(
                "Encryption key must be {KEY_LEN} bytes, got {}",
                decoded.len()
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self::from_bytes(bytes))
    }

    /// Encode for one-time disclosure to the caller.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_slice())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for EncryptionKey {}

/// One-way fingerprint of an [`EncryptionKey`].
///
/// SHA-256 over the key's base64 text, itself base64 encoded. Stored on
/// records and safe to log; useless for decryption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    pub fn of(key: &EncryptionKey) -> Self {
        let encoded = Zeroizing::new(key.to_base64());
        let digest = Sha256::digest(encoded.as_bytes());
        Self(STANDARD.encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether `key` produces this fingerprint.
    pub fn matches(&self, key: &EncryptionKey) -> bool {
        Self::of(key) == *self
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for KeyFingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}
