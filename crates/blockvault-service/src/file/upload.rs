//! Upload: encrypt, store, pin, and commit a new file or version.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use blockvault_core::config::StorageConfig;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::{ContentAddress, FileId};
use blockvault_crypto::{EncryptionEngine, EncryptionKey};
use blockvault_database::MetadataStore;
use blockvault_entity::file::{FileRecord, FileVersion, NewFile, NewVersion};

use super::{owned_file, unpin_if_unreferenced};
use super::version::VersionService;
use crate::context::RequestContext;
use crate::quota::QuotaLedger;

/// One upload call.
#[derive(Clone, Default)]
pub struct UploadRequest {
    /// Display name. Ignored when appending to an existing file.
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    pub encrypt: bool,
    /// Base64 key to encrypt with. Without one, a key is generated and
    /// returned once in [`UploadOutcome::generated_key`].
    pub key: Option<String>,
    /// Append a version to this file instead of creating a new one.
    pub target: Option<FileId>,
    /// Free-text description of a new version.
    pub description: Option<String>,
}

impl UploadRequest {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn encrypted(mut self, key: Option<String>) -> Self {
        self.encrypt = true;
        self.key = key;
        self
    }

    pub fn new_version_of(mut self, file_id: FileId, description: Option<String>) -> Self {
        self.target = Some(file_id);
        self.description = description;
        self
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("bytes", &self.data.len())
            .field("encrypt", &self.encrypt)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("target", &self.target)
            .field("description", &self.description)
            .finish()
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub record: FileRecord,
    pub version: FileVersion,
    /// Present only when the key was generated by this call. It is not
    /// stored anywhere and cannot be recovered later.
    pub generated_key: Option<EncryptionKey>,
}

/// Payload after the optional encryption step.
struct Sealed {
    bytes: Bytes,
    fingerprint: Option<String>,
    generated_key: Option<EncryptionKey>,
}

/// Sequences the upload steps. Nothing is written to the metadata store
/// until the blob is stored; a commit failure after that leaves an unpinned,
/// unreferenced blob, never a record without content.
#[derive(Debug, Clone)]
pub struct UploadService {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    engine: EncryptionEngine,
    ledger: QuotaLedger,
    versions: VersionService,
    config: StorageConfig,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        ledger: QuotaLedger,
        versions: VersionService,
        config: StorageConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            engine: EncryptionEngine::new(),
            ledger,
            versions,
            config,
        }
    }

    pub async fn upload(&self, ctx: &RequestContext, request: UploadRequest) -> AppResult<UploadOutcome> {
        if request.data.is_empty() {
            return Err(AppError::empty_payload("Cannot upload an empty file"));
        }
        if request.data.len() as u64 > self.config.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {} bytes",
                self.config.max_upload_size_bytes
            )));
        }
        if request.key.is_some() && !request.encrypt {
            return Err(AppError::validation(
                "An encryption key was supplied for an unencrypted upload",
            ));
        }
        let size = i64::try_from(request.data.len())
            .map_err(|_| AppError::validation("File is too large"))?;

        let filename = match request.target {
            Some(file_id) => owned_file(self.store.as_ref(), ctx, file_id).await?.filename,
            None => {
                let name = request.filename.trim();
                if name.is_empty() {
                    return Err(AppError::validation("Filename must not be empty"));
                }
                name.to_string()
            }
        };

        if !self.ledger.has_capacity(ctx.user_id, size).await? {
            return Err(AppError::quota_exceeded(format!(
                "Storage quota exceeded: {size} more bytes do not fit"
            )));
        }

        let sealed = self.seal(&request)?;
        let cid = self.blobs.put(sealed.bytes).await?;
        let pinned = self.pin_best_effort(&cid).await;

        let committed = match request.target {
            Some(file_id) => {
                self.versions
                    .append_version(NewVersion {
                        file_id,
                        owner_id: ctx.user_id,
                        cid: cid.clone(),
                        size_bytes: size,
                        encrypted: request.encrypt,
                        key_fingerprint: sealed.fingerprint,
                        pinned,
                        description: request.description,
                    })
                    .await
            }
            None => {
                self.store
                    .insert_file(NewFile {
                        owner_id: ctx.user_id,
                        filename,
                        content_type: request.content_type,
                        cid: cid.clone(),
                        size_bytes: size,
                        encrypted: request.encrypt,
                        key_fingerprint: sealed.fingerprint,
                        pinned,
                        replication_count: self.config.replication_count,
                    })
                    .await
            }
        };

        let (record, version) = match committed {
            Ok(committed) => committed,
            Err(e) => {
                warn!(
                    user_id = %ctx.user_id,
                    request_id = %ctx.request_id,
                    cid = %cid,
                    error = %e,
                    "Metadata commit failed after blob write; blob left unreferenced"
                );
                if pinned {
                    // The failed commit wrote no row, so no reference is excluded.
                    unpin_if_unreferenced(
                        self.store.as_ref(),
                        self.blobs.as_ref(),
                        &cid,
                        FileId::new(),
                    )
                    .await;
                }
                return Err(e);
            }
        };

        info!(
            user_id = %ctx.user_id,
            request_id = %ctx.request_id,
            file_id = %record.id,
            cid = %record.cid,
            size,
            version = version.version_number,
            encrypted = record.encrypted,
            "Upload committed"
        );

        Ok(UploadOutcome {
            record,
            version,
            generated_key: sealed.generated_key,
        })
    }

    fn seal(&self, request: &UploadRequest) -> AppResult<Sealed> {
        if !request.encrypt {
            return Ok(Sealed {
                bytes: request.data.clone(),
                fingerprint: None,
                generated_key: None,
            });
        }

        let (key, generated) = match &request.key {
            Some(encoded) => (EncryptionKey::from_base64(encoded)?, false),
            None => (self.engine.generate_key(), true),
        };
        let ciphertext = self.engine.encrypt(&request.data, &key)?;

        Ok(Sealed {
            bytes: Bytes::from(ciphertext),
            fingerprint: Some(self.engine.fingerprint(&key).into_string()),
            generated_key: generated.then_some(key),
        })
    }

    async fn pin_best_effort(&self, cid: &ContentAddress) -> bool {
        match self.blobs.pin(cid).await {
            Ok(()) => true,
            Err(e) => {
                warn!(cid = %cid, error = %e, "Pin failed; continuing unpinned");
                false
            }
        }
    }
}
