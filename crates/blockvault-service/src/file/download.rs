//! Download: resolve, fetch, and decrypt.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::{ContentAddress, FileId};
use blockvault_crypto::{EncryptionEngine, EncryptionKey, KeyFingerprint};
use blockvault_database::MetadataStore;
use blockvault_entity::file::FileRecord;

use super::{owned_file, require_owner};
use super::version::VersionService;
use crate::context::RequestContext;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// How a caller names the file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocator {
    Id(FileId),
    /// The current content address of a record.
    Cid(ContentAddress),
}

impl From<FileId> for FileLocator {
    fn from(id: FileId) -> Self {
        Self::Id(id)
    }
}

impl From<ContentAddress> for FileLocator {
    fn from(cid: ContentAddress) -> Self {
        Self::Cid(cid)
    }
}

/// Plaintext content plus what the caller needs to serve it.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_id: FileId,
    pub filename: String,
    pub content_type: String,
    pub version_number: i32,
    pub data: Bytes,
}

/// Where the bytes of one version live and how they were sealed.
struct Sealed<'a> {
    cid: &'a ContentAddress,
    encrypted: bool,
    fingerprint: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct DownloadService {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    engine: EncryptionEngine,
    versions: VersionService,
}

impl DownloadService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        versions: VersionService,
    ) -> Self {
        Self {
            store,
            blobs,
            engine: EncryptionEngine::new(),
            versions,
        }
    }

    /// Download the current version of a file.
    ///
    /// Encrypted content without `key` fails with `KeyRequired`; a wrong
    /// key or tampered blob fails with `IntegrityError`. Ciphertext is never
    /// returned.
    pub async fn download(
        &self,
        ctx: &RequestContext,
        locator: FileLocator,
        key: Option<&str>,
    ) -> AppResult<DownloadedFile> {
        let record = self.resolve(ctx, locator).await?;
        let data = self
            .open(
                Sealed {
                    cid: &record.cid,
                    encrypted: record.encrypted,
                    fingerprint: record.key_fingerprint.as_deref(),
                },
                key,
            )
            .await?;

        info!(
            user_id = %ctx.user_id,
            request_id = %ctx.request_id,
            file_id = %record.id,
            version = record.current_version,
            "File downloaded"
        );
        Ok(downloaded(&record, record.current_version, data))
    }

    /// Download a historical version, decrypting with the key it was sealed
    /// under.
    pub async fn download_version(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        version_number: i32,
        key: Option<&str>,
    ) -> AppResult<DownloadedFile> {
        let (record, version) = self.versions.get_version(ctx, file_id, version_number).await?;
        let data = self
            .open(
                Sealed {
                    cid: &version.cid,
                    encrypted: version.encrypted,
                    fingerprint: version.key_fingerprint.as_deref(),
                },
                key,
            )
            .await?;

        info!(
            user_id = %ctx.user_id,
            request_id = %ctx.request_id,
            file_id = %record.id,
            version = version_number,
            "File version downloaded"
        );
        Ok(downloaded(&record, version_number, data))
    }

    async fn resolve(&self, ctx: &RequestContext, locator: FileLocator) -> AppResult<FileRecord> {
        match locator {
            FileLocator::Id(id) => owned_file(self.store.as_ref(), ctx, id).await,
            FileLocator::Cid(cid) => {
                let record = self
                    .store
                    .find_file_by_cid(&cid)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("No file has content {cid}")))?;
                require_owner(ctx, &record)?;
                Ok(record)
            }
        }
    }

    async fn open(&self, sealed: Sealed<'_>, key: Option<&str>) -> AppResult<Bytes> {
        if !sealed.encrypted {
            return self.blobs.get(sealed.cid).await;
        }

        let encoded = key.ok_or_else(|| AppError::key_required("This file is encrypted; a key is required"))?;
        // A malformed key cannot be the right key.
        let key = EncryptionKey::from_base64(encoded)
            .map_err(|_| AppError::integrity("Decryption failed: wrong key or tampered data"))?;
        let mismatched = sealed
            .fingerprint
            .is_some_and(|expected| !KeyFingerprint::from(expected.to_string()).matches(&key));
        if mismatched {
            return Err(AppError::integrity("Decryption failed: wrong key or tampered data"));
        }

        let ciphertext = self.blobs.get(sealed.cid).await?;
        let plaintext = self.engine.decrypt(&ciphertext, &key)?;
        Ok(Bytes::from(plaintext))
    }
}

fn downloaded(record: &FileRecord, version_number: i32, data: Bytes) -> DownloadedFile {
    DownloadedFile {
        file_id: record.id,
        filename: record.filename.clone(),
        content_type: record
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        version_number,
        data,
    }
}
