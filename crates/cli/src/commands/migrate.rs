//! Database migration command.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in the
//! storefront crate, so the binary needs no source checkout to run them.

use bazaar_storefront::db::MIGRATOR;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from applying migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
