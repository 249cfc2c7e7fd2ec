//! In-process blob store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::ContentAddress;

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<ContentAddress, Bytes>,
    pins: HashSet<ContentAddress>,
}

/// Blob store backed by a map. Contents are lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, cid: &ContentAddress) -> bool {
        self.inner.read().await.blobs.contains_key(cid)
    }

    pub async fn is_pinned(&self, cid: &ContentAddress) -> bool {
        self.inner.read().await.pins.contains(cid)
    }

    /// Number of distinct blobs held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.blobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrite the bytes stored under `cid`, breaking content addressing.
    /// Lets tests simulate a tampered backend.
    pub async fn overwrite(&self, cid: &ContentAddress, data: Bytes) {
        self.inner.write().await.blobs.insert(cid.clone(), data);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, data: Bytes) -> AppResult<ContentAddress> {
        let cid = ContentAddress::for_bytes(&data);
        self.inner
            .write()
            .await
            .blobs
            .entry(cid.clone())
            .or_insert(data);
        Ok(cid)
    }

    async fn get(&self, cid: &ContentAddress) -> AppResult<Bytes> {
        self.inner
            .read()
            .await
            .blobs
            .get(cid)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("No blob stored under {cid}")))
    }

    async fn pin(&self, cid: &ContentAddress) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.blobs.contains_key(cid) {
            return Err(AppError::not_found(format!("Cannot pin unknown blob {cid}")));
        }
        inner.pins.insert(cid.clone());
        Ok(())
    }

    async fn unpin(&self, cid: &ContentAddress) -> AppResult<()> {
        self.inner.write().await.pins.remove(cid);
        Ok(())
    }
}
