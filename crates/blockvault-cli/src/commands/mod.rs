//! CLI command definitions and dispatch.

pub mod file;
pub mod health;
pub mod migrate;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use blockvault_core::config::AppConfig;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_core::types::FileId;
use blockvault_database::{DatabasePool, PgMetadataStore};
use blockvault_service::{FileLifecycle, RequestContext};
use blockvault_storage::build_blob_store;

use crate::output::OutputFormat;

/// BlockVault: encrypted, content-addressed file storage with quotas and
/// version history
#[derive(Debug, Parser)]
#[command(name = "blockvault", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Principal management
    User(user::UserArgs),
    /// File lifecycle operations on behalf of a principal
    File(file::FileArgs),
    /// Check the metadata store and blob store
    Health,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::User(args) => user::execute(args, config, self.format).await,
            Commands::File(args) => file::execute(args, config, self.format).await,
            Commands::Health => health::execute(config, self.format).await,
        }
    }
}

/// Helper: load configuration from file and `BLOCKVAULT__*` variables
pub fn load_config(config_path: &str) -> AppResult<AppConfig> {
    AppConfig::load(config_path)
}

/// Helper: connect to the metadata database
pub async fn create_db_pool(config: &AppConfig) -> AppResult<DatabasePool> {
    DatabasePool::connect(&config.database).await
}

/// Helper: wire the orchestrator over PostgreSQL and the configured blob store
pub async fn build_lifecycle(config: &AppConfig) -> AppResult<FileLifecycle> {
    let pool = create_db_pool(config).await?;
    let store = Arc::new(PgMetadataStore::new(pool.into_pool()));
    let blobs = build_blob_store(&config.storage).await?;
    Ok(FileLifecycle::new(store, blobs, config))
}

/// Helper: resolve the acting principal by username.
///
/// The CLI stands in for the auth gateway: whoever runs it may act as any
/// registered principal.
pub async fn act_as(lifecycle: &FileLifecycle, username: &str) -> AppResult<RequestContext> {
    let user = lifecycle.users().find_by_username(username).await?;
    Ok(RequestContext::for_user(&user))
}

/// Helper: parse a file id argument
pub fn parse_file_id(value: &str) -> AppResult<FileId> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid file id '{}': {}", value, e)))
}
