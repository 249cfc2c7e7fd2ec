//! Shared fixtures for lifecycle tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use blockvault_core::config::AppConfig;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::{ContentAddress, FileId, UserId};
use blockvault_database::{MemoryMetadataStore, MetadataStore, QuotaAdjustment};
use blockvault_entity::file::{FileRecord, FileVersion, NewFile, NewVersion};
use blockvault_entity::user::{CreateUser, User};
use blockvault_service::{FileLifecycle, RequestContext};
use blockvault_storage::MemoryBlobStore;

pub struct Harness {
    pub lifecycle: FileLifecycle,
    pub store: Arc<MemoryMetadataStore>,
    pub blobs: Arc<FlakyBlobStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_metadata(Arc::new(MemoryMetadataStore::new()))
    }

    pub fn with_metadata(store: Arc<MemoryMetadataStore>) -> Self {
        let blobs = Arc::new(FlakyBlobStore::default());
        let lifecycle = FileLifecycle::new(store.clone(), blobs.clone(), &AppConfig::default());
        Self {
            lifecycle,
            store,
            blobs,
        }
    }

    /// Register a principal and return a context acting as them.
    pub async fn principal(&self, username: &str, quota: i64) -> RequestContext {
        let user = self
            .lifecycle
            .users()
            .register(username, None, Some(quota))
            .await
            .expect("register principal");
        RequestContext::for_user(&user)
    }

    pub async fn used(&self, ctx: &RequestContext) -> i64 {
        self.lifecycle
            .usage(ctx.user_id)
            .await
            .expect("usage")
            .used_bytes
    }
}

/// Memory blob store whose operations can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyBlobStore {
    pub inner: MemoryBlobStore,
    pub fail_put: AtomicBool,
    pub fail_pins: AtomicBool,
}

impl FlakyBlobStore {
    pub fn fail_puts(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pins(&self, fail: bool) {
        self.fail_pins.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    fn provider_type(&self) -> &str {
        "flaky"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.fail_put.load(Ordering::SeqCst))
    }

    async fn put(&self, data: Bytes) -> AppResult<ContentAddress> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::storage_unavailable("IPFS daemon is unreachable"));
        }
        self.inner.put(data).await
    }

    async fn get(&self, cid: &ContentAddress) -> AppResult<Bytes> {
        self.inner.get(cid).await
    }

    async fn pin(&self, cid: &ContentAddress) -> AppResult<()> {
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(AppError::storage_unavailable("pin timed out"));
        }
        self.inner.pin(cid).await
    }

    async fn unpin(&self, cid: &ContentAddress) -> AppResult<()> {
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(AppError::storage_unavailable("unpin timed out"));
        }
        self.inner.unpin(cid).await
    }
}

/// Memory metadata store whose file commits always fail.
#[derive(Debug, Default)]
pub struct BrokenCommits {
    pub inner: MemoryMetadataStore,
}

#[async_trait]
impl MetadataStore for BrokenCommits {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.inner.find_user_by_username(username).await
    }

    async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        self.inner.create_user(data).await
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        self.inner.find_file(id).await
    }

    async fn find_file_by_cid(&self, cid: &ContentAddress) -> AppResult<Option<FileRecord>> {
        self.inner.find_file_by_cid(cid).await
    }

    async fn list_files(
        &self,
        owner: UserId,
        limit: Option<u32>,
    ) -> AppResult<Vec<FileRecord>> {
        self.inner.list_files(owner, limit).await
    }

    async fn list_versions(&self, file_id: FileId) -> AppResult<Vec<FileVersion>> {
        self.inner.list_versions(file_id).await
    }

    async fn find_version(
        &self,
        file_id: FileId,
        version_number: i32,
    ) -> AppResult<Option<FileVersion>> {
        self.inner.find_version(file_id, version_number).await
    }

    async fn latest_version_number(&self, file_id: FileId) -> AppResult<i32> {
        self.inner.latest_version_number(file_id).await
    }

    async fn count_cid_references(
        &self,
        cid: &ContentAddress,
        exclude_file: FileId,
    ) -> AppResult<i64> {
        self.inner.count_cid_references(cid, exclude_file).await
    }

    async fn insert_file(
        &self,
        _data: NewFile,
    ) -> AppResult<(FileRecord, FileVersion)> {
        Err(AppError::persistence("connection reset by peer"))
    }

    async fn append_version(
        &self,
        _data: NewVersion,
    ) -> AppResult<(FileRecord, FileVersion)> {
        Err(AppError::persistence("connection reset by peer"))
    }

    async fn delete_file(
        &self,
        file_id: FileId,
        owner: UserId,
    ) -> AppResult<i64> {
        self.inner.delete_file(file_id, owner).await
    }

    async fn adjust_usage(
        &self,
        user: UserId,
        adjustment: QuotaAdjustment,
    ) -> AppResult<User> {
        self.inner.adjust_usage(user, adjustment).await
    }

    async fn set_attestation(
        &self,
        file_id: FileId,
        reference: &str,
    ) -> AppResult<FileRecord> {
        self.inner.set_attestation(file_id, reference).await
    }

    async fn metered_bytes(&self, owner: UserId) -> AppResult<i64> {
        self.inner.metered_bytes(owner).await
    }
}
