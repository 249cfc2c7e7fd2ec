//! Principal registration and lookup.

use std::sync::Arc;

use tracing::info;

use blockvault_core::config::QuotaConfig;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_database::MetadataStore;
use blockvault_entity::user::{CreateUser, User};

/// Registers principals and resolves them by name for the auth gateway.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<dyn MetadataStore>,
    default_quota: i64,
}

impl UserService {
    pub fn new(store: Arc<dyn MetadataStore>, config: &QuotaConfig) -> Self {
        Self {
            store,
            default_quota: config.default_quota_bytes,
        }
    }

    /// Register a principal. `quota` falls back to the configured default.
    pub async fn register(
        &self,
        username: &str,
        email: Option<String>,
        quota: Option<i64>,
    ) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }
        let storage_quota = quota.unwrap_or(self.default_quota);
        if storage_quota < 0 {
            return Err(AppError::validation("Storage quota must not be negative"));
        }

        let user = self
            .store
            .create_user(CreateUser {
                username: username.to_string(),
                email,
                credential_hash: None,
                storage_quota,
            })
            .await?;
        info!(user_id = %user.id, username = %user.username, "Principal registered");
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))
    }
}
