//! Database operations for the `shop` schema.
//!
//! ## Tables
//!
//! - `user`, `user_password`, `user_profile` - Accounts
//! - `category`, `product` - Catalog
//! - `order`, `order_item` - Purchase ledger
//! - `cart_item` - Persisted carts of signed-in users
//! - `product_review`, `wishlist_item`, `product_request` - Customer feedback
//! - `newsletter_subscriber` - Mailing list
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod newsletter;
pub mod orders;
pub mod product_requests;
pub mod products;
pub mod reviews;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use product_requests::ProductRequestRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Embedded migrations for the storefront schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Delete rejected because other rows still reference this one.
    #[error("protected: {0}")]
    Protected(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to their domain variants.
    ///
    /// `what` names the thing that collided, e.g. `"slug"`.
    #[must_use]
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Protected(format!("{what} is referenced by other records"));
            }
            if db_err.is_check_violation() {
                return Self::Conflict(format!("{what} violates a constraint"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Clamp a caller-supplied page size.
pub(crate) fn limit(n: u32) -> i64 {
    i64::from(n.clamp(1, 100))
}

/// Convert a stored `INTEGER` count into `u32`.
pub(crate) fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}
