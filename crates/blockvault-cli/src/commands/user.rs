//! Principal management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use blockvault_core::config::AppConfig;
use blockvault_core::result::AppResult;
use blockvault_entity::storage::{StorageQuota, format_bytes};

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a principal
    Create {
        /// Username
        username: String,
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
        /// Storage quota in bytes (defaults to `quota.default_quota_bytes`)
        #[arg(short, long)]
        quota: Option<i64>,
    },
    /// Show storage usage
    Usage {
        /// Username
        username: String,
    },
    /// Recompute used storage from the stored file versions
    Reconcile {
        /// Username
        username: String,
    },
}

#[derive(Debug, Serialize)]
struct UsageReport<'a> {
    username: &'a str,
    #[serde(flatten)]
    quota: &'a StorageQuota,
}

/// Execute user commands
pub async fn execute(args: &UserArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let lifecycle = super::build_lifecycle(config).await?;

    match &args.command {
        UserCommand::Create {
            username,
            email,
            quota,
        } => {
            let user = lifecycle
                .users()
                .register(username, email.clone(), *quota)
                .await?;

            match format {
                OutputFormat::Json => output::print_json(&user, "{}"),
                OutputFormat::Table => output::print_success(&format!(
                    "User '{}' created (id: {}, quota: {})",
                    user.username,
                    user.id,
                    format_bytes(user.storage_quota)
                )),
            }
        }
        UserCommand::Usage { username } => {
            let user = lifecycle.users().find_by_username(username).await?;
            let quota = lifecycle.usage(user.id).await?;
            print_usage(&user.username, &quota, format);
        }
        UserCommand::Reconcile { username } => {
            let before = lifecycle.users().find_by_username(username).await?;
            let after = lifecycle.reconcile(before.id).await?;

            match format {
                OutputFormat::Json => print_usage(&after.username, &after.quota(), format),
                OutputFormat::Table => {
                    if before.used_storage == after.used_storage {
                        output::print_success(&format!(
                            "Usage for '{}' already consistent ({})",
                            after.username,
                            format_bytes(after.used_storage)
                        ));
                    } else {
                        output::print_warning(&format!(
                            "Usage for '{}' corrected: {} -> {}",
                            after.username,
                            format_bytes(before.used_storage),
                            format_bytes(after.used_storage)
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_usage(username: &str, quota: &StorageQuota, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(&UsageReport { username, quota }, "{}"),
        OutputFormat::Table => {
            println!("Storage usage for '{}':", username);
            output::print_kv("Quota", &format_bytes(quota.total_bytes));
            output::print_kv("Used", &format_bytes(quota.used_bytes));
            output::print_kv("Available", &format_bytes(quota.available_bytes));
            output::print_kv("Usage", &format!("{:.1}%", quota.usage_percent));
        }
    }
}
