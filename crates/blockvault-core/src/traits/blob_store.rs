//! Blob store trait for content-addressed payload backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::ContentAddress;

/// Client contract for a content-addressed blob store.
///
/// Implementations exist for an IPFS daemon, a local directory, and an
/// in-process map. The trait is defined here in `blockvault-core` and
/// implemented in `blockvault-storage`.
///
/// Every method maps an unreachable or timed-out backend to
/// `StorageUnavailable`. `get` fails with `NotFound` for an unknown address.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g. "ipfs", "local").
    fn provider_type(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store a payload and return its address.
    ///
    /// The address is a deterministic function of `data`; storing identical
    /// bytes twice yields the same address and is harmless.
    async fn put(&self, data: Bytes) -> AppResult<ContentAddress>;

    /// Fetch the payload stored under `cid`.
    async fn get(&self, cid: &ContentAddress) -> AppResult<Bytes>;

    /// Ask the backend to retain `cid`. Advisory.
    async fn pin(&self, cid: &ContentAddress) -> AppResult<()>;

    /// Tell the backend `cid` no longer needs to be retained. Advisory.
    async fn unpin(&self, cid: &ContentAddress) -> AppResult<()>;
}
