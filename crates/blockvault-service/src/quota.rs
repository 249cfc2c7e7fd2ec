//! Quota Ledger: per-principal storage accounting.

use std::sync::Arc;

use tracing::{info, warn};

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::types::UserId;
use blockvault_database::{MetadataStore, QuotaAdjustment};
use blockvault_entity::storage::StorageQuota;
use blockvault_entity::user::User;

/// Reads and mutates a principal's used-storage counter.
///
/// Mutations go through the metadata store's row-locked
/// [`MetadataStore::adjust_usage`], so concurrent reservations for one
/// principal never both pass against a stale counter. Uploads do not call
/// [`QuotaLedger::reserve`]; their reservation is committed together with
/// the file record.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    store: Arc<dyn MetadataStore>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    async fn user(&self, id: UserId) -> AppResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    /// Whether `delta` more bytes fit. An advisory pre-check; the
    /// authoritative check runs again inside the commit.
    pub async fn has_capacity(&self, user: UserId, delta: i64) -> AppResult<bool> {
        Ok(self.user(user).await?.has_capacity(delta))
    }

    /// Charge `delta` bytes. Fails with `QuotaExceeded`, leaving usage as is.
    pub async fn reserve(&self, user: UserId, delta: i64) -> AppResult<User> {
        ensure_non_negative(delta)?;
        self.store
            .adjust_usage(user, QuotaAdjustment::Reserve(delta))
            .await
    }

    /// Return `delta` bytes; usage never drops below zero.
    pub async fn release(&self, user: UserId, delta: i64) -> AppResult<User> {
        ensure_non_negative(delta)?;
        let before = self.user(user).await?.used_storage;
        let updated = self
            .store
            .adjust_usage(user, QuotaAdjustment::Release(delta))
            .await?;
        if delta > before {
            warn!(user_id = %user, used = before, released = delta, "Release exceeded usage; clamped at zero");
        }
        Ok(updated)
    }

    /// Accounting snapshot.
    pub async fn usage(&self, user: UserId) -> AppResult<StorageQuota> {
        Ok(self.user(user).await?.quota())
    }

    /// Recompute usage from the sizes of every stored version.
    pub async fn reconcile(&self, user: UserId) -> AppResult<User> {
        let before = self.user(user).await?.used_storage;
        let updated = self
            .store
            .adjust_usage(user, QuotaAdjustment::Reconcile)
            .await?;

        if updated.used_storage != before {
            warn!(
                user_id = %user,
                recorded = before,
                metered = updated.used_storage,
                "Usage drift repaired"
            );
        } else {
            info!(user_id = %user, used = before, "Usage already consistent");
        }
        Ok(updated)
    }
}

fn ensure_non_negative(delta: i64) -> AppResult<()> {
    if delta < 0 {
        return Err(AppError::validation("Quota adjustment must not be negative"));
    }
    Ok(())
}
