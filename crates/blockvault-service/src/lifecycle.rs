//! The File Lifecycle Orchestrator: one entry point over every file service.

use std::sync::Arc;

use blockvault_core::config::AppConfig;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::{FileId, UserId};
use blockvault_database::MetadataStore;
use blockvault_entity::file::{FileRecord, FileVersion};
use blockvault_entity::storage::StorageQuota;
use blockvault_entity::user::User;

use crate::context::RequestContext;
use crate::file::{
    DownloadService, DownloadedFile, FileLocator, FileService, UploadOutcome, UploadRequest,
    UploadService, VersionService,
};
use crate::quota::QuotaLedger;
use crate::user::UserService;

/// Composes the quota ledger, version manager, encryption engine, blob
/// store and metadata store into upload, download, delete and share
/// operations.
#[derive(Debug, Clone)]
pub struct FileLifecycle {
    blobs: Arc<dyn BlobStore>,
    uploads: UploadService,
    downloads: DownloadService,
    files: FileService,
    versions: VersionService,
    ledger: QuotaLedger,
    users: UserService,
}

impl FileLifecycle {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        config: &AppConfig,
    ) -> Self {
        let ledger = QuotaLedger::new(store.clone());
        let versions = VersionService::new(store.clone());

        Self {
            uploads: UploadService::new(
                store.clone(),
                blobs.clone(),
                ledger.clone(),
                versions.clone(),
                config.storage.clone(),
            ),
            downloads: DownloadService::new(store.clone(), blobs.clone(), versions.clone()),
            files: FileService::new(
                store.clone(),
                blobs.clone(),
                config.storage.gateway_url.clone(),
                config.quota.recent_files_limit,
            ),
            users: UserService::new(store, &config.quota),
            blobs,
            versions,
            ledger,
        }
    }

    pub async fn upload(&self, ctx: &RequestContext, request: UploadRequest) -> AppResult<UploadOutcome> {
        self.uploads.upload(ctx, request).await
    }

    pub async fn download(
        &self,
        ctx: &RequestContext,
        locator: impl Into<FileLocator>,
        key: Option<&str>,
    ) -> AppResult<DownloadedFile> {
        self.downloads.download(ctx, locator.into(), key).await
    }

    pub async fn download_version(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        version_number: i32,
        key: Option<&str>,
    ) -> AppResult<DownloadedFile> {
        self.downloads
            .download_version(ctx, file_id, version_number, key)
            .await
    }

    pub async fn delete(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<i64> {
        self.files.delete(ctx, file_id).await
    }

    pub async fn share_link(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<String> {
        self.files.share_link(ctx, file_id).await
    }

    pub async fn get_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<FileRecord> {
        self.files.get_file(ctx, file_id).await
    }

    pub async fn list_files(&self, ctx: &RequestContext) -> AppResult<Vec<FileRecord>> {
        self.files.list_files(ctx).await
    }

    pub async fn recent_files(&self, ctx: &RequestContext) -> AppResult<Vec<FileRecord>> {
        self.files.recent_files(ctx).await
    }

    pub async fn list_versions(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<Vec<FileVersion>> {
        self.versions.list_versions(ctx, file_id).await
    }

    pub async fn attach_attestation(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        reference: &str,
    ) -> AppResult<FileRecord> {
        self.files.attach_attestation(ctx, file_id, reference).await
    }

    pub async fn usage(&self, user: UserId) -> AppResult<StorageQuota> {
        self.ledger.usage(user).await
    }

    pub async fn reconcile(&self, user: UserId) -> AppResult<User> {
        self.ledger.reconcile(user).await
    }

    pub async fn blob_store_healthy(&self) -> AppResult<bool> {
        self.blobs.health_check().await
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }
}
