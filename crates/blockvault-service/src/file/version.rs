//! Version Manager: the append-only version sequence of each file.

use std::sync::Arc;

use tracing::info;

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::types::FileId;
use blockvault_database::MetadataStore;
use blockvault_entity::file::{FileRecord, FileVersion, NewVersion};

use super::owned_file;
use crate::context::RequestContext;

/// Maintains each file's `1..N` version sequence.
#[derive(Debug, Clone)]
pub struct VersionService {
    store: Arc<dyn MetadataStore>,
}

impl VersionService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// The number the next appended version would receive right now.
    ///
    /// Informational only: [`VersionService::append_version`] recomputes it
    /// under the file's row lock.
    pub async fn next_version_number(&self, file_id: FileId) -> AppResult<i32> {
        Ok(self.store.latest_version_number(file_id).await? + 1)
    }

    /// Append an immutable version, reserve its size, and advance the
    /// record's current pointer in one unit of work.
    pub async fn append_version(&self, data: NewVersion) -> AppResult<(FileRecord, FileVersion)> {
        let (record, version) = self.store.append_version(data).await?;
        info!(
            file_id = %record.id,
            version = version.version_number,
            cid = %version.cid,
            size = version.size_bytes,
            "Version appended"
        );
        Ok((record, version))
    }

    /// Versions of an owned file, newest first.
    pub async fn list_versions(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
    ) -> AppResult<Vec<FileVersion>> {
        owned_file(self.store.as_ref(), ctx, file_id).await?;
        self.store.list_versions(file_id).await
    }

    /// One version of an owned file.
    pub async fn get_version(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        version_number: i32,
    ) -> AppResult<(FileRecord, FileVersion)> {
        let file = owned_file(self.store.as_ref(), ctx, file_id).await?;
        let version = self
            .store
            .find_version(file_id, version_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("File {file_id} has no version {version_number}"))
            })?;
        Ok((file, version))
    }
}
