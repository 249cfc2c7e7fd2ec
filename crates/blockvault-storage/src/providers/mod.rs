//! Blob store backends.

pub mod ipfs;
pub mod local;
pub mod memory;

pub use ipfs::IpfsBlobStore;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
