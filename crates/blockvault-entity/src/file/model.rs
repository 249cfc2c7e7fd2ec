//! File record entity.

use blockvault_core::types::{ContentAddress, FileId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::category::FileCategory;

/// Description attached to the first version of every file.
pub const INITIAL_VERSION_DESCRIPTION: &str = "Initial upload";

/// A file owned by a principal. Points at the content of its latest version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: FileId,
    /// The owning principal.
    pub owner_id: UserId,
    /// Display name, including extension.
    pub filename: String,
    /// Address of the current version's blob.
    pub cid: ContentAddress,
    /// Pre-encryption size of the current version.
    pub size_bytes: i64,
    /// Coarse classification derived from the filename.
    pub file_type: FileCategory,
    /// Declared MIME type, returned on download.
    pub content_type: Option<String>,
    /// Whether the current version's blob is ciphertext.
    pub encrypted: bool,
    /// Fingerprint of the key that encrypted the current version.
    pub key_fingerprint: Option<String>,
    /// Whether the blob store acknowledged a pin for the current version.
    pub pinned: bool,
    pub replication_count: i32,
    /// Number of the latest version. Always equals the highest version row.
    pub current_version: i32,
    pub uploaded_at: DateTime<Utc>,
    /// Opaque reference returned by the attestation collaborator, if any.
    pub attestation_ref: Option<String>,
}

impl FileRecord {
    /// Check whether the given principal owns this file.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Data required to create a file record together with its first version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    pub owner_id: UserId,
    pub filename: String,
    pub content_type: Option<String>,
    /// Address of the stored blob.
    pub cid: ContentAddress,
    /// Declared pre-encryption size; this is what quota is charged.
    pub size_bytes: i64,
    pub encrypted: bool,
    pub key_fingerprint: Option<String>,
    pub pinned: bool,
    pub replication_count: i32,
}

impl NewFile {
    /// Category of the new record.
    pub fn file_type(&self) -> FileCategory {
        FileCategory::from_filename(&self.filename)
    }
}

/// Data required to append a version to an existing file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVersion {
    pub file_id: FileId,
    /// Principal performing the append; must own the file.
    pub owner_id: UserId,
    pub cid: ContentAddress,
    pub size_bytes: i64,
    pub encrypted: bool,
    pub key_fingerprint: Option<String>,
    pub pinned: bool,
    pub description: Option<String>,
}
