//! Principal entity model.

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::storage::StorageQuota;

/// A principal known to BlockVault.
///
/// Authentication happens upstream; this row only carries identity and
/// storage accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    /// Unique name.
    pub username: String,
    pub email: Option<String>,
    /// Opaque credential material owned by the auth gateway.
    #[serde(skip_serializing)]
    pub credential_hash: Option<String>,
    /// Total storage allowance in bytes.
    pub storage_quota: i64,
    /// Bytes currently charged against the allowance.
    pub used_storage: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether `size` more bytes fit in the remaining allowance.
    pub fn has_capacity(&self, size: i64) -> bool {
        !self.quota().would_exceed(size)
    }

    /// Charge `delta` bytes, returning the new usage.
    pub fn reserve(&self, delta: i64) -> AppResult<i64> {
        if !self.has_capacity(delta) {
            return Err(AppError::quota_exceeded(format!(
                "Storage quota exceeded: {} used of {}, {} requested",
                self.used_storage, self.storage_quota, delta
            )));
        }
        Ok(self.used_storage + delta)
    }

    /// Release `delta` bytes, returning the new usage clamped at zero.
    pub fn release(&self, delta: i64) -> i64 {
        (self.used_storage - delta).max(0)
    }

    /// Accounting snapshot.
    pub fn quota(&self) -> StorageQuota {
        StorageQuota::new(self.storage_quota, self.used_storage)
    }
}

/// Data required to register a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: Option<String>,
    pub credential_hash: Option<String>,
    pub storage_quota: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockvault_core::error::ErrorKind;

    fn user(quota: i64, used: i64) -> User {
        User {
            id: UserId::new(),
            username: "alice".to_string(),
            email: None,
            credential_hash: None,
            storage_quota: quota,
            used_storage: used,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reserve_up_to_quota() {
        let u = user(1000, 600);
        assert_eq!(u.reserve(400).expect("fits"), 1000);
        let err = u.reserve(500).expect_err("over quota");
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    }

    #[test]
    fn test_release_clamps_at_zero() {
        let u = user(1000, 100);
        assert_eq!(u.release(40), 60);
        assert_eq!(u.release(250), 0);
    }

    #[test]
    fn test_credential_is_not_serialized() {
        let mut u = user(10, 0);
        u.credential_hash = Some("secret".to_string());
        let json = serde_json::to_string(&u).expect("serialize");
        assert!(!json.contains("secret"));
    }
}
