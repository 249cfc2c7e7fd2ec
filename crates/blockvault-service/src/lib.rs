//! # blockvault-service
//!
//! The File Lifecycle Orchestrator and the components it composes. Each
//! service takes its collaborators as `Arc` trait objects at construction
//! time; [`FileLifecycle`] wires them together from configuration.
//!
//! Every operation acts on behalf of the principal in a [`RequestContext`],
//! which the caller obtains from its auth gateway. No credential checks
//! happen here.

pub mod context;
pub mod file;
pub mod lifecycle;
pub mod quota;
pub mod user;

pub use context::RequestContext;
pub use file::{
    DownloadService, DownloadedFile, FileLocator, FileService, UploadOutcome, UploadRequest,
    UploadService, VersionService,
};
pub use lifecycle::FileLifecycle;
pub use quota::QuotaLedger;
pub use user::UserService;
