//! # blockvault-storage
//!
//! Implementations of [`blockvault_core::traits::BlobStore`]: an IPFS daemon
//! client, a content-addressed local directory, and an in-memory map, plus
//! [`build_blob_store`] which selects one from configuration.

pub mod factory;
pub mod providers;

pub use factory::build_blob_store;
pub use providers::{IpfsBlobStore, LocalBlobStore, MemoryBlobStore};
