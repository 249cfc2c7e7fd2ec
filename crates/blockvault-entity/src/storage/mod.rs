//! Storage accounting value objects.

pub mod quota;

pub use quota::{StorageQuota, format_bytes};
