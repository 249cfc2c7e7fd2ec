//! Request context carrying the authenticated principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blockvault_core::types::UserId;
use blockvault_entity::user::User;

/// Who is acting, as vouched for by the auth gateway.
///
/// Passed into every service method so each operation knows its principal
/// and can be correlated in logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: UserId,
    pub username: String,
    /// Correlation id for log lines.
    pub request_id: Uuid,
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            request_id: Uuid::now_v7(),
            request_time: Utc::now(),
        }
    }

    /// Context for an already-resolved principal.
    pub fn for_user(user: &User) -> Self {
        Self::new(user.id, user.username.clone())
    }
}
