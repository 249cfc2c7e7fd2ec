//! Per-principal quota configuration.

use serde::{Deserialize, Serialize};

/// Quota defaults applied to newly registered principals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Storage quota granted to a new principal, in bytes (default 5 GiB).
    #[serde(default = "default_quota")]
    pub default_quota_bytes: i64,
    /// How many files `recent_files` returns.
    #[serde(default = "default_recent_limit")]
    pub recent_files_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_quota_bytes: default_quota(),
            recent_files_limit: default_recent_limit(),
        }
    }
}

fn default_quota() -> i64 {
    5_368_709_120 // 5 GiB
}

fn default_recent_limit() -> u32 {
    4
}
