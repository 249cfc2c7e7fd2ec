//! Core type definitions used across the BlockVault workspace.

pub mod content_address;
pub mod id;

pub use content_address::ContentAddress;
pub use id::*;
