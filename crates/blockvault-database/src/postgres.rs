//! PostgreSQL metadata store.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use blockvault_core::error::{AppError, ErrorKind};
use blockvault_core::result::AppResult;
use blockvault_core::types::{ContentAddress, FileId, FileVersionId, UserId};
use blockvault_entity::file::model::INITIAL_VERSION_DESCRIPTION;
use blockvault_entity::file::{FileRecord, FileVersion, NewFile, NewVersion};
use blockvault_entity::user::{CreateUser, User};

use crate::store::{MetadataStore, QuotaAdjustment};

/// Metadata store backed by PostgreSQL.
///
/// Mutations run in one transaction each and take `FOR UPDATE` row locks on
/// the principal, then the file.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::PersistenceError, "Failed to begin transaction", e)
        })
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::PersistenceError, message, e)
}

/// Map a write error, turning unique violations into caller-facing kinds.
fn write_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("files_cid_key") => {
            AppError::duplicate_content("This content is already stored as another file")
        }
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_username_key") => {
            AppError::validation("Username is already taken")
        }
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
            AppError::validation("Email is already registered")
        }
        _ => AppError::with_source(ErrorKind::PersistenceError, message, e),
    }
}

async fn lock_user(tx: &mut Transaction<'static, Postgres>, id: UserId) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("Failed to lock user"))?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
}

async fn lock_file(tx: &mut Transaction<'static, Postgres>, id: FileId) -> AppResult<FileRecord> {
    sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("Failed to lock file"))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
}

/// Sum of every version size across the principal's files.
async fn sum_metered<'e, E: PgExecutor<'e>>(executor: E, owner: UserId) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(v.size_bytes), 0)::BIGINT FROM file_versions v \
         JOIN files f ON f.id = v.file_id WHERE f.owner_id = $1",
    )
    .bind(owner)
    .fetch_one(executor)
    .await
    .map_err(db_error("Failed to sum metered bytes"))
}

async fn set_used_storage(
    tx: &mut Transaction<'static, Postgres>,
    id: UserId,
    used: i64,
) -> AppResult<User> {
    sqlx::query_as::<_, User>("UPDATE users SET used_storage = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(used)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("Failed to update used storage"))
}

async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(db_error("Failed to commit transaction"))
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find user by id"))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find user by username"))
    }

    async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, credential_hash, storage_quota, used_storage, created_at) \
             VALUES ($1, $2, $3, $4, $5, 0, NOW()) RETURNING *",
        )
        .bind(UserId::new())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.credential_hash)
        .bind(data.storage_quota)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error("Failed to create user"))?;

        info!(user_id = %user.id, username = %user.username, quota = user.storage_quota, "User created");
        Ok(user)
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find file"))
    }

    async fn find_file_by_cid(&self, cid: &ContentAddress) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE cid = $1")
            .bind(cid)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find file by content address"))
    }

    async fn list_files(&self, owner: UserId, limit: Option<u32>) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE owner_id = $1 ORDER BY uploaded_at DESC, id DESC LIMIT $2",
        )
        .bind(owner)
        .bind(limit.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list files"))
    }

    async fn list_versions(&self, file_id: FileId) -> AppResult<Vec<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 ORDER BY version_number DESC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list versions"))
    }

    async fn find_version(
        &self,
        file_id: FileId,
        version_number: i32,
    ) -> AppResult<Option<FileVersion>> {
        sqlx::query_as::<_, FileVersion>(
            "SELECT * FROM file_versions WHERE file_id = $1 AND version_number = $2",
        )
        .bind(file_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find version"))
    }

    async fn latest_version_number(&self, file_id: FileId) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(version_number), 0) FROM file_versions WHERE file_id = $1",
        )
        .bind(file_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to read latest version"))
    }

    async fn count_cid_references(
        &self,
        cid: &ContentAddress,
        exclude_file: FileId,
    ) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM file_versions WHERE cid = $1 AND file_id <> $2",
        )
        .bind(cid)
        .bind(exclude_file)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count content references"))
    }

    async fn insert_file(&self, data: NewFile) -> AppResult<(FileRecord, FileVersion)> {
        let mut tx = self.begin().await?;

        let owner = lock_user(&mut tx, data.owner_id).await?;
        let used = owner.reserve(data.size_bytes)?;

        let record = sqlx::query_as::<_, FileRecord>(
            "INSERT INTO files (id, owner_id, filename, cid, size_bytes, file_type, content_type, \
             encrypted, key_fingerprint, pinned, replication_count, current_version, uploaded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, NOW()) RETURNING *",
        )
        .bind(FileId::new())
        .bind(data.owner_id)
        .bind(&data.filename)
        .bind(&data.cid)
        .bind(data.size_bytes)
        .bind(data.file_type())
        .bind(&data.content_type)
        .bind(data.encrypted)
        .bind(&data.key_fingerprint)
        .bind(data.pinned)
        .bind(data.replication_count)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_error("Failed to insert file"))?;

        let version = sqlx::query_as::<_, FileVersion>(
            "INSERT INTO file_versions (id, file_id, version_number, cid, size_bytes, description, \
             encrypted, key_fingerprint, created_at) \
             VALUES ($1, $2, 1, $3, $4, $5, $6, $7, NOW()) RETURNING *",
        )
        .bind(FileVersionId::new())
        .bind(record.id)
        .bind(&data.cid)
        .bind(data.size_bytes)
        .bind(INITIAL_VERSION_DESCRIPTION)
        .bind(data.encrypted)
        .bind(&data.key_fingerprint)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_error("Failed to insert initial version"))?;

        set_used_storage(&mut tx, data.owner_id, used).await?;
        commit(tx).await?;

        debug!(file_id = %record.id, user_id = %record.owner_id, used, "File record committed");
        Ok((record, version))
    }

    async fn append_version(&self, data: NewVersion) -> AppResult<(FileRecord, FileVersion)> {
        let mut tx = self.begin().await?;

        let owner = lock_user(&mut tx, data.owner_id).await?;
        let file = lock_file(&mut tx, data.file_id).await?;
        if !file.is_owned_by(data.owner_id) {
            return Err(AppError::access_denied("You do not own this file"));
        }
        let used = owner.reserve(data.size_bytes)?;

        let next: i32 = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(version_number), 0) + 1 FROM file_versions WHERE file_id = $1",
        )
        .bind(data.file_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to compute next version"))?;

        let version = sqlx::query_as::<_, FileVersion>(
            "INSERT INTO file_versions (id, file_id, version_number, cid, size_bytes, description, \
             encrypted, key_fingerprint, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING *",
        )
        .bind(FileVersionId::new())
        .bind(data.file_id)
        .bind(next)
        .bind(&data.cid)
        .bind(data.size_bytes)
        .bind(&data.description)
        .bind(data.encrypted)
        .bind(&data.key_fingerprint)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_error("Failed to insert version"))?;

        let record = sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET cid = $2, size_bytes = $3, encrypted = $4, key_fingerprint = $5, \
             pinned = $6, current_version = $7 WHERE id = $1 RETURNING *",
        )
        .bind(data.file_id)
        .bind(&data.cid)
        .bind(data.size_bytes)
        .bind(data.encrypted)
        .bind(&data.key_fingerprint)
        .bind(data.pinned)
        .bind(next)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_error("Failed to advance current version"))?;

        set_used_storage(&mut tx, data.owner_id, used).await?;
        commit(tx).await?;

        debug!(file_id = %record.id, version = next, used, "Version committed");
        Ok((record, version))
    }

    async fn delete_file(&self, file_id: FileId, owner: UserId) -> AppResult<i64> {
        let mut tx = self.begin().await?;

        let user = lock_user(&mut tx, owner).await?;
        let file = lock_file(&mut tx, file_id).await?;
        if !file.is_owned_by(owner) {
            return Err(AppError::access_denied("You do not own this file"));
        }

        let metered: i64 = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM file_versions WHERE file_id = $1",
        )
        .bind(file_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to sum version sizes"))?;

        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete file"))?;

        set_used_storage(&mut tx, owner, user.release(metered)).await?;
        commit(tx).await?;

        Ok(metered)
    }

    async fn adjust_usage(&self, user: UserId, adjustment: QuotaAdjustment) -> AppResult<User> {
        let mut tx = self.begin().await?;
        let current = lock_user(&mut tx, user).await?;

        let used = match adjustment {
            QuotaAdjustment::Reserve(delta) => current.reserve(delta)?,
            QuotaAdjustment::Release(delta) => current.release(delta),
            QuotaAdjustment::Reconcile => sum_metered(&mut *tx, user).await?,
        };

        let updated = set_used_storage(&mut tx, user, used).await?;
        commit(tx).await?;
        Ok(updated)
    }

    async fn set_attestation(&self, file_id: FileId, reference: &str) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET attestation_ref = $2 WHERE id = $1 RETURNING *",
        )
        .bind(file_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to record attestation"))?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    async fn metered_bytes(&self, owner: UserId) -> AppResult<i64> {
        sum_metered(&self.pool, owner).await
    }
}
