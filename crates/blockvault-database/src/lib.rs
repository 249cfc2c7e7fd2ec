//! # blockvault-database
//!
//! The metadata store. [`MetadataStore`] is the contract the orchestrator
//! depends on; [`PgMetadataStore`] implements it on PostgreSQL with row
//! locks, and [`MemoryMetadataStore`] implements it in process for tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryMetadataStore;
pub use postgres::PgMetadataStore;
pub use store::{MetadataStore, QuotaAdjustment};
