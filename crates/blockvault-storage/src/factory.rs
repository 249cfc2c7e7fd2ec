//! Blob store selection from configuration.

use std::sync::Arc;

use tracing::{info, warn};

use blockvault_core::config::{BlobProvider, StorageConfig};
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;

use crate::providers::{IpfsBlobStore, LocalBlobStore, MemoryBlobStore};

/// Build the blob store named by `config.provider`.
///
/// An unreachable IPFS daemon is logged, not fatal: calls made while it is
/// down fail with `StorageUnavailable`.
pub async fn build_blob_store(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.provider {
        BlobProvider::Ipfs => Arc::new(IpfsBlobStore::new(&config.ipfs)?),
        BlobProvider::Local => Arc::new(LocalBlobStore::new(&config.local.root_path).await?),
        BlobProvider::Memory => Arc::new(MemoryBlobStore::new()),
    };

    match store.health_check().await {
        Ok(true) => info!(provider = store.provider_type(), "Blob store ready"),
        Ok(false) => warn!(
            provider = store.provider_type(),
            "Blob store is not reachable; storage operations will fail until it is"
        ),
        Err(e) => warn!(provider = store.provider_type(), error = %e, "Blob store health check errored"),
    }

    Ok(store)
}
