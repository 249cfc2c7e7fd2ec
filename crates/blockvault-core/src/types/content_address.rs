//! Content addresses: identifiers derived from the bytes they name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// CIDv1 prefix bytes: version 1, `raw` codec, `sha2-256` multihash of length 32.
const CID_V1_RAW_SHA256_PREFIX: [u8; 4] = [0x01, 0x55, 0x12, 0x20];

/// Multibase prefix for lowercase base16.
const MULTIBASE_BASE16: char = 'f';

/// The address under which a payload is stored in the blob store.
///
/// Addresses produced by an IPFS daemon are kept verbatim. Stores that
/// compute addresses themselves use [`ContentAddress::for_bytes`], which
/// yields a base16 CIDv1 over the raw bytes, so identical bytes always map
/// to the identical address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Compute the address of a byte payload.
    pub fn for_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut raw = Vec::with_capacity(CID_V1_RAW_SHA256_PREFIX.len() + digest.len());
        raw.extend_from_slice(&CID_V1_RAW_SHA256_PREFIX);
        raw.extend_from_slice(&digest);
        Self(format!("{MULTIBASE_BASE16}{}", hex::encode(raw)))
    }

    /// Validate and wrap an address string returned by a blob store or a caller.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Content address must not be empty"));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::validation(format!(
                "Content address contains invalid characters: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for logs and tables (`abcdef…uvwxyz`).
    pub fn short(&self) -> String {
        if self.0.len() <= 16 {
            return self.0.clone();
        }
        format!("{}…{}", &self.0[..8], &self.0[self.0.len() - 6..])
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ContentAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
