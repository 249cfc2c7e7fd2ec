//! Blob store configuration.

use serde::{Deserialize, Serialize};

/// Which blob store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobProvider {
    /// An IPFS (kubo) daemon reached over its HTTP RPC API.
    Ipfs,
    /// A content-addressed directory on the local filesystem.
    Local,
    /// A process-local map. Contents are lost on exit.
    Memory,
}

/// Top-level blob storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default = "default_provider")]
    pub provider: BlobProvider,
    /// Public gateway base used for share links (`<gateway>/<cid>`).
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Replication count recorded on new file records.
    #[serde(default = "default_replication_count")]
    pub replication_count: i32,
    /// Maximum upload size in bytes (default 5 GiB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// IPFS daemon settings.
    #[serde(default)]
    pub ipfs: IpfsConfig,
    /// Local directory store settings.
    #[serde(default)]
    pub local: LocalBlobConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            gateway_url: default_gateway_url(),
            replication_count: default_replication_count(),
            max_upload_size_bytes: default_max_upload(),
            ipfs: IpfsConfig::default(),
            local: LocalBlobConfig::default(),
        }
    }
}

/// IPFS HTTP RPC client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpfsConfig {
    /// Base URL of the daemon's RPC API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Local content-addressed directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBlobConfig {
    /// Root directory for blobs and pin markers.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalBlobConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

fn default_provider() -> BlobProvider {
    BlobProvider::Ipfs
}

fn default_gateway_url() -> String {
    "https://ipfs.io/ipfs".to_string()
}

fn default_replication_count() -> i32 {
    1
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GiB
}

fn default_api_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_local_root() -> String {
    "./data/blobs".to_string()
}
