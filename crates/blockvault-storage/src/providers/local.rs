//! Content-addressed blob store on the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use blockvault_core::error::{AppError, ErrorKind};
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::ContentAddress;

/// Stores each blob at `<root>/blobs/<cid>` and each pin as an empty marker
/// at `<root>/pins/<cid>`.
///
/// Writes go to `<root>/tmp` first and are renamed into place, so a reader
/// never observes a partial blob.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Open (creating if needed) a store rooted at `root_path`.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        for dir in ["blobs", "pins", "tmp"] {
            let path = root.join(dir);
            fs::create_dir_all(&path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to create blob directory: {}", path.display()),
                    e,
                )
            })?;
        }
        Ok(Self { root })
    }

    fn blob_path(&self, cid: &ContentAddress) -> PathBuf {
        self.root.join("blobs").join(cid.as_str())
    }

    fn pin_path(&self, cid: &ContentAddress) -> PathBuf {
        self.root.join("pins").join(cid.as_str())
    }

    /// Whether a pin marker exists for `cid`.
    pub async fn is_pinned(&self, cid: &ContentAddress) -> bool {
        fs::try_exists(self.pin_path(cid)).await.unwrap_or(false)
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> AppError {
    AppError::with_source(
        ErrorKind::StorageUnavailable,
        format!("Failed to {action} {}", path.display()),
        e,
    )
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.join("blobs").is_dir())
    }

    async fn put(&self, data: Bytes) -> AppResult<ContentAddress> {
        let cid = ContentAddress::for_bytes(&data);
        let target = self.blob_path(&cid);
        if fs::try_exists(&target).await.unwrap_or(false) {
            debug!(cid = %cid, "Blob already present");
            return Ok(cid);
        }

        let staging = self.root.join("tmp").join(Uuid::new_v4().to_string());
        fs::write(&staging, &data)
            .await
            .map_err(|e| io_error("write", &staging, e))?;
        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(io_error("commit", &target, e));
        }

        debug!(cid = %cid, bytes = data.len(), "Blob written");
        Ok(cid)
    }

    async fn get(&self, cid: &ContentAddress) -> AppResult<Bytes> {
        let path = self.blob_path(cid);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("No blob stored under {cid}"))
            } else {
                io_error("read", &path, e)
            }
        })?;

        if ContentAddress::for_bytes(&data) != *cid {
            return Err(AppError::integrity(format!(
                "Blob {} does not match its address",
                cid.short()
            )));
        }
        Ok(Bytes::from(data))
    }

    async fn pin(&self, cid: &ContentAddress) -> AppResult<()> {
        if !fs::try_exists(self.blob_path(cid)).await.unwrap_or(false) {
            return Err(AppError::not_found(format!("Cannot pin unknown blob {cid}")));
        }
        let marker = self.pin_path(cid);
        fs::write(&marker, b"")
            .await
            .map_err(|e| io_error("pin", &marker, e))
    }

    async fn unpin(&self, cid: &ContentAddress) -> AppResult<()> {
        let marker = self.pin_path(cid);
        match fs::remove_file(&marker).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("unpin", &marker, e)),
        }
    }
}
