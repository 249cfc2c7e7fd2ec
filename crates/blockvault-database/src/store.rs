//! The metadata store contract.

use async_trait::async_trait;

use blockvault_core::result::AppResult;
use blockvault_core::types::{ContentAddress, FileId, UserId};
use blockvault_entity::file::{FileRecord, FileVersion, NewFile, NewVersion};
use blockvault_entity::user::{CreateUser, User};

/// A change to a principal's used-storage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaAdjustment {
    /// Charge bytes; fails with `QuotaExceeded` if they do not fit.
    Reserve(i64),
    /// Return bytes; the counter clamps at zero.
    Release(i64),
    /// Reset the counter to the sum of the principal's version sizes.
    Reconcile,
}

/// Persistence for principals, file records and versions.
///
/// Every mutating method is a single unit of work: the principal's row (and
/// the file's row, where one is involved) is locked for its duration, so
/// concurrent calls for the same principal or file serialize. Locks are
/// always taken principal first, then file.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug + 'static {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Register a principal with zero usage.
    async fn create_user(&self, data: CreateUser) -> AppResult<User>;

    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>>;

    /// Find the record whose current content lives at `cid`.
    async fn find_file_by_cid(&self, cid: &ContentAddress) -> AppResult<Option<FileRecord>>;

    /// Files owned by `owner`, newest upload first, optionally truncated.
    async fn list_files(&self, owner: UserId, limit: Option<u32>) -> AppResult<Vec<FileRecord>>;

    /// Versions of a file, highest number first.
    async fn list_versions(&self, file_id: FileId) -> AppResult<Vec<FileVersion>>;

    async fn find_version(
        &self,
        file_id: FileId,
        version_number: i32,
    ) -> AppResult<Option<FileVersion>>;

    /// Highest version number of a file, 0 if it has none.
    async fn latest_version_number(&self, file_id: FileId) -> AppResult<i32>;

    /// How many versions outside `exclude_file` reference `cid`.
    async fn count_cid_references(
        &self,
        cid: &ContentAddress,
        exclude_file: FileId,
    ) -> AppResult<i64>;

    /// Create a record and its version 1, reserving `size_bytes` on the
    /// owner in the same unit of work.
    ///
    /// Fails with `QuotaExceeded` (nothing written), `NotFound` for an
    /// unknown owner, or `DuplicateContent` when another record already
    /// points at `cid`.
    async fn insert_file(&self, data: NewFile) -> AppResult<(FileRecord, FileVersion)>;

    /// Append the next version to a file, reserve its size, and advance the
    /// record's current pointer, all in one unit of work.
    ///
    /// The version number is computed under the file's row lock, so two
    /// concurrent appends receive consecutive numbers.
    async fn append_version(&self, data: NewVersion) -> AppResult<(FileRecord, FileVersion)>;

    /// Delete a file and its versions, releasing the sum of its version
    /// sizes from the owner. Returns the bytes released.
    async fn delete_file(&self, file_id: FileId, owner: UserId) -> AppResult<i64>;

    /// Apply a quota adjustment and return the updated principal.
    async fn adjust_usage(&self, user: UserId, adjustment: QuotaAdjustment) -> AppResult<User>;

    /// Record the advisory attestation reference on a file.
    async fn set_attestation(&self, file_id: FileId, reference: &str) -> AppResult<FileRecord>;

    /// Sum of the sizes of every version of every file `owner` holds.
    async fn metered_bytes(&self, owner: UserId) -> AppResult<i64>;
}
