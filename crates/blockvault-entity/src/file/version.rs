//! File version entity.

use blockvault_core::types::{ContentAddress, FileId, FileVersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One immutable historical version of a file.
///
/// Version numbers start at 1 and are gap-free per file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileVersion {
    pub id: FileVersionId,
    /// The file this version belongs to.
    pub file_id: FileId,
    pub version_number: i32,
    /// Address of this version's blob.
    pub cid: ContentAddress,
    /// Pre-encryption size in bytes.
    pub size_bytes: i64,
    /// Optional comment describing the change.
    pub description: Option<String>,
    pub encrypted: bool,
    pub key_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}
