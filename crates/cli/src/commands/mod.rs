//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use bazaar_storefront::config::{ConfigError, get_database_url};
use bazaar_storefront::db;
use sqlx::PgPool;

/// Connect using `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Errors from opening the database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
