//! File record management: lookup, listing, delete, share links.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::traits::BlobStore;
use blockvault_core::types::{ContentAddress, FileId};
use blockvault_database::MetadataStore;
use blockvault_entity::file::FileRecord;

use super::{owned_file, unpin_if_unreferenced};
use crate::context::RequestContext;

#[derive(Debug, Clone)]
pub struct FileService {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    gateway_url: String,
    recent_limit: u32,
}

impl FileService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        gateway_url: impl Into<String>,
        recent_limit: u32,
    ) -> Self {
        Self {
            store,
            blobs,
            gateway_url: gateway_url.into(),
            recent_limit,
        }
    }

    pub async fn get_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<FileRecord> {
        owned_file(self.store.as_ref(), ctx, file_id).await
    }

    /// Every file the principal owns, newest first.
    pub async fn list_files(&self, ctx: &RequestContext) -> AppResult<Vec<FileRecord>> {
        self.store.list_files(ctx.user_id, None).await
    }

    /// The most recently uploaded files.
    pub async fn recent_files(&self, ctx: &RequestContext) -> AppResult<Vec<FileRecord>> {
        self.store
            .list_files(ctx.user_id, Some(self.recent_limit))
            .await
    }

    /// Delete a file and all its versions, returning the bytes released
    /// from the owner's quota.
    ///
    /// Blobs no other file references are unpinned first; an unpin failure
    /// is logged and never blocks the delete.
    pub async fn delete(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<i64> {
        let file = owned_file(self.store.as_ref(), ctx, file_id).await?;

        let cids: BTreeSet<ContentAddress> = self
            .store
            .list_versions(file_id)
            .await?
            .into_iter()
            .map(|v| v.cid)
            .chain(std::iter::once(file.cid.clone()))
            .collect();
        for cid in &cids {
            unpin_if_unreferenced(self.store.as_ref(), self.blobs.as_ref(), cid, file_id).await;
        }

        let released = self.store.delete_file(file_id, ctx.user_id).await?;
        info!(
            user_id = %ctx.user_id,
            request_id = %ctx.request_id,
            file_id = %file_id,
            released,
            "File deleted"
        );
        Ok(released)
    }

    /// Public retrieval URL, `<gateway>/<cid>`, for the current version.
    pub async fn share_link(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<String> {
        let file = owned_file(self.store.as_ref(), ctx, file_id).await?;
        Ok(share_url(&self.gateway_url, &file.cid))
    }

    /// Record an advisory external attestation (e.g. a transaction hash).
    pub async fn attach_attestation(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        reference: &str,
    ) -> AppResult<FileRecord> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::validation("Attestation reference must not be empty"));
        }
        owned_file(self.store.as_ref(), ctx, file_id).await?;
        let record = self.store.set_attestation(file_id, reference).await?;
        info!(file_id = %file_id, attestation = reference, "Attestation recorded");
        Ok(record)
    }
}

pub fn share_url(gateway_url: &str, cid: &ContentAddress) -> String {
    format!("{}/{}", gateway_url.trim_end_matches('/'), cid)
}
