//! File services: upload, download, versioning, and record management.

pub mod download;
pub mod service;
pub mod upload;
pub mod version;

pub use download::{DownloadService, DownloadedFile, FileLocator};
pub use service::FileService;
pub use upload::{UploadOutcome, UploadRequest, UploadService};
pub use version::VersionService;

use tracing::{info, warn};

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::{ContentAddress, FileId};
use blockvault_database::MetadataStore;
use blockvault_entity::file::FileRecord;

use crate::context::RequestContext;

/// Load a file and require that the acting principal owns it.
pub(crate) async fn owned_file(
    store: &dyn MetadataStore,
    ctx: &RequestContext,
    file_id: FileId,
) -> AppResult<FileRecord> {
    let file = store
        .find_file(file_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
    require_owner(ctx, &file)?;
    Ok(file)
}

pub(crate) fn require_owner(ctx: &RequestContext, file: &FileRecord) -> AppResult<()> {
    if file.is_owned_by(ctx.user_id) {
        Ok(())
    } else {
        Err(AppError::access_denied("You do not own this file"))
    }
}

/// Unpin `cid` unless a file other than `exclude` still references it.
/// Best effort: failures are logged and the content stays pinned.
pub(crate) async fn unpin_if_unreferenced(
    store: &dyn MetadataStore,
    blobs: &dyn BlobStore,
    cid: &ContentAddress,
    exclude: FileId,
) {
    match store.count_cid_references(cid, exclude).await {
        Ok(0) => {
            if let Err(e) = blobs.unpin(cid).await {
                warn!(cid = %cid, error = %e, "Unpin failed; content left pinned");
            }
        }
        Ok(refs) => info!(cid = %cid, refs, "Content still referenced; left pinned"),
        Err(e) => warn!(cid = %cid, error = %e, "Could not count references; left pinned"),
    }
}
