//! Core traits defined in `blockvault-core` and implemented by other crates.

pub mod blob_store;

pub use blob_store::BlobStore;
