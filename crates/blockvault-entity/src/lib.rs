//! # blockvault-entity
//!
//! Domain entity models for BlockVault. Every struct in this crate
//! represents a metadata-store row or a domain value object. Row entities
//! additionally derive `sqlx::FromRow`.

pub mod file;
pub mod storage;
pub mod user;
