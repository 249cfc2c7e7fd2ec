//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use blockvault_core::error::{AppError, ErrorKind};

/// Apply every pending migration under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying metadata store migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::PersistenceError,
                format!("Failed to apply migrations: {e}"),
                e,
            )
        })?;

    info!("Metadata store schema is up to date");
    Ok(())
}
