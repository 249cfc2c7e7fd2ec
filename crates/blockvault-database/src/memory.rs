//! In-process metadata store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::types::{ContentAddress, FileId, FileVersionId, UserId};
use blockvault_entity::file::model::INITIAL_VERSION_DESCRIPTION;
use blockvault_entity::file::{FileRecord, FileVersion, NewFile, NewVersion};
use blockvault_entity::user::{CreateUser, User};

use crate::store::{MetadataStore, QuotaAdjustment};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    /// Insertion order, oldest first.
    files: Vec<FileRecord>,
    /// Versions per file, ascending by number.
    versions: HashMap<FileId, Vec<FileVersion>>,
}

impl State {
    fn user(&self, id: UserId) -> AppResult<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    fn file_index(&self, id: FileId) -> AppResult<usize> {
        self.files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    fn cid_taken_by_other(&self, cid: &ContentAddress, file: Option<FileId>) -> bool {
        self.files
            .iter()
            .any(|f| f.cid == *cid && Some(f.id) != file)
    }

    fn set_used(&mut self, id: UserId, used: i64) -> AppResult<User> {
        let user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.used_storage = used;
        Ok(user.clone())
    }

    fn metered(&self, owner: UserId) -> i64 {
        self.files
            .iter()
            .filter(|f| f.owner_id == owner)
            .filter_map(|f| self.versions.get(&f.id))
            .flatten()
            .map(|v| v.size_bytes)
            .sum()
    }
}

/// Metadata store held in process memory behind a single async mutex.
///
/// Each mutation runs entirely under the lock, which gives it the same
/// all-or-nothing behavior as a database transaction. Contents are lost
/// when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    state: Arc<Mutex<State>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&data.username))
        {
            return Err(AppError::validation("Username is already taken"));
        }
        if data.storage_quota < 0 {
            return Err(AppError::validation("Storage quota must not be negative"));
        }

        let user = User {
            id: UserId::new(),
            username: data.username,
            email: data.email,
            credential_hash: data.credential_hash,
            storage_quota: data.storage_quota,
            used_storage: 0,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());

        info!(user_id = %user.id, username = %user.username, quota = user.storage_quota, "User created");
        Ok(user)
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        let state = self.state.lock().await;
        Ok(state.files.iter().find(|f| f.id == id).cloned())
    }

    async fn find_file_by_cid(&self, cid: &ContentAddress) -> AppResult<Option<FileRecord>> {
        let state = self.state.lock().await;
        Ok(state.files.iter().find(|f| f.cid == *cid).cloned())
    }

    async fn list_files(&self, owner: UserId, limit: Option<u32>) -> AppResult<Vec<FileRecord>> {
        let state = self.state.lock().await;
        let mut files: Vec<FileRecord> = state
            .files
            .iter()
            .rev()
            .filter(|f| f.owner_id == owner)
            .cloned()
            .collect();
        // Stable, so ties keep the newest insertion first.
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        if let Some(limit) = limit {
            files.truncate(limit as usize);
        }
        Ok(files)
    }

    async fn list_versions(&self, file_id: FileId) -> AppResult<Vec<FileVersion>> {
        let state = self.state.lock().await;
        let mut versions = state.versions.get(&file_id).cloned().unwrap_or_default();
        versions.reverse();
        Ok(versions)
    }

    async fn find_version(
        &self,
        file_id: FileId,
        version_number: i32,
    ) -> AppResult<Option<FileVersion>> {
        let state = self.state.lock().await;
        Ok(state
            .versions
            .get(&file_id)
            .and_then(|vs| vs.iter().find(|v| v.version_number == version_number))
            .cloned())
    }

    async fn latest_version_number(&self, file_id: FileId) -> AppResult<i32> {
        let state = self.state.lock().await;
        Ok(state
            .versions
            .get(&file_id)
            .and_then(|vs| vs.iter().map(|v| v.version_number).max())
            .unwrap_or(0))
    }

    async fn count_cid_references(
        &self,
        cid: &ContentAddress,
        exclude_file: FileId,
    ) -> AppResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .versions
            .iter()
            .filter(|(file_id, _)| **file_id != exclude_file)
            .flat_map(|(_, vs)| vs.iter())
            .filter(|v| v.cid == *cid)
            .count();
        Ok(count as i64)
    }

    async fn insert_file(&self, data: NewFile) -> AppResult<(FileRecord, FileVersion)> {
        let mut state = self.state.lock().await;

        let used = state.user(data.owner_id)?.reserve(data.size_bytes)?;
        if state.cid_taken_by_other(&data.cid, None) {
            return Err(AppError::duplicate_content(
                "This content is already stored as another file",
            ));
        }

        let now = Utc::now();
        let record = FileRecord {
            id: FileId::new(),
            owner_id: data.owner_id,
            file_type: data.file_type(),
            filename: data.filename,
            cid: data.cid.clone(),
            size_bytes: data.size_bytes,
            content_type: data.content_type,
            encrypted: data.encrypted,
            key_fingerprint: data.key_fingerprint.clone(),
            pinned: data.pinned,
            replication_count: data.replication_count,
            current_version: 1,
            uploaded_at: now,
            attestation_ref: None,
        };
        let version = FileVersion {
            id: FileVersionId::new(),
            file_id: record.id,
            version_number: 1,
            cid: data.cid,
            size_bytes: data.size_bytes,
            description: Some(INITIAL_VERSION_DESCRIPTION.to_string()),
            encrypted: data.encrypted,
            key_fingerprint: data.key_fingerprint,
            created_at: now,
        };

        state.set_used(data.owner_id, used)?;
        state.files.push(record.clone());
        state.versions.insert(record.id, vec![version.clone()]);
        Ok((record, version))
    }

    async fn append_version(&self, data: NewVersion) -> AppResult<(FileRecord, FileVersion)> {
        let mut state = self.state.lock().await;

        let owner = state.user(data.owner_id)?.clone();
        let idx = state.file_index(data.file_id)?;
        if !state.files[idx].is_owned_by(data.owner_id) {
            return Err(AppError::access_denied("You do not own this file"));
        }
        let used = owner.reserve(data.size_bytes)?;
        if state.cid_taken_by_other(&data.cid, Some(data.file_id)) {
            return Err(AppError::duplicate_content(
                "This content is already stored as another file",
            ));
        }

        let next = state
            .versions
            .get(&data.file_id)
            .and_then(|vs| vs.last())
            .map(|v| v.version_number)
            .unwrap_or(0)
            + 1;
        let version = FileVersion {
            id: FileVersionId::new(),
            file_id: data.file_id,
            version_number: next,
            cid: data.cid.clone(),
            size_bytes: data.size_bytes,
            description: data.description,
            encrypted: data.encrypted,
            key_fingerprint: data.key_fingerprint.clone(),
            created_at: Utc::now(),
        };

        state.set_used(data.owner_id, used)?;
        state
            .versions
            .entry(data.file_id)
            .or_default()
            .push(version.clone());

        let record = &mut state.files[idx];
        record.cid = data.cid;
        record.size_bytes = data.size_bytes;
        record.encrypted = data.encrypted;
        record.key_fingerprint = data.key_fingerprint;
        record.pinned = data.pinned;
        record.current_version = next;

        Ok((record.clone(), version))
    }

    async fn delete_file(&self, file_id: FileId, owner: UserId) -> AppResult<i64> {
        let mut state = self.state.lock().await;

        let user = state.user(owner)?.clone();
        let idx = state.file_index(file_id)?;
        if !state.files[idx].is_owned_by(owner) {
            return Err(AppError::access_denied("You do not own this file"));
        }

        let metered: i64 = state
            .versions
            .get(&file_id)
            .map(|vs| vs.iter().map(|v| v.size_bytes).sum())
            .unwrap_or(0);

        state.set_used(owner, user.release(metered))?;
        state.files.remove(idx);
        state.versions.remove(&file_id);
        Ok(metered)
    }

    async fn adjust_usage(&self, user: UserId, adjustment: QuotaAdjustment) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let current = state.user(user)?;

        let used = match adjustment {
            QuotaAdjustment::Reserve(delta) => current.reserve(delta)?,
            QuotaAdjustment::Release(delta) => current.release(delta),
            QuotaAdjustment::Reconcile => state.metered(user),
        };
        state.set_used(user, used)
    }

    async fn set_attestation(&self, file_id: FileId, reference: &str) -> AppResult<FileRecord> {
        let mut state = self.state.lock().await;
        let idx = state.file_index(file_id)?;
        let record = &mut state.files[idx];
        record.attestation_ref = Some(reference.to_string());
        Ok(record.clone())
    }

    async fn metered_bytes(&self, owner: UserId) -> AppResult<i64> {
        Ok(self.state.lock().await.metered(owner))
    }
}
