//! # blockvault-core
//!
//! Core crate for BlockVault. Contains the blob store trait, configuration
//! schemas, typed identifiers, content addresses, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other BlockVault crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
