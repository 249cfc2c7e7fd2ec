//! Reachability check for both backing stores.

use serde::Serialize;

use blockvault_core::config::AppConfig;
use blockvault_core::error::AppError;
use blockvault_core::result::AppResult;
use blockvault_database::connection::mask_password;
use blockvault_storage::build_blob_store;

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct HealthReport {
    database: bool,
    database_url: String,
    blob_store: bool,
    blob_provider: String,
}

/// Report whether the metadata store and blob store answer. Fails when
/// either is down so scripts can use the exit status.
pub async fn execute(config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let database = match super::create_db_pool(config).await {
        Ok(pool) => {
            let healthy = pool.health_check().await.unwrap_or(false);
            pool.close().await;
            healthy
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metadata store connection failed");
            false
        }
    };

    let blobs = build_blob_store(&config.storage).await?;
    let blob_store = blobs.health_check().await.unwrap_or(false);

    let report = HealthReport {
        database,
        database_url: mask_password(&config.database.url),
        blob_store,
        blob_provider: blobs.provider_type().to_string(),
    };

    match format {
        OutputFormat::Json => output::print_json(&report, "{}"),
        OutputFormat::Table => {
            println!("BlockVault health:");
            output::print_kv("Database", &status(report.database));
            output::print_kv("Database URL", &report.database_url);
            output::print_kv("Blob store", &status(report.blob_store));
            output::print_kv("Blob provider", &report.blob_provider);
        }
    }

    if report.database && report.blob_store {
        Ok(())
    } else {
        Err(AppError::storage_unavailable(
            "One or more backing stores are unreachable",
        ))
    }
}

fn status(healthy: bool) -> String {
    if healthy { "ok" } else { "unreachable" }.to_string()
}
