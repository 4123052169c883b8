//! Admin session configuration.
//!
//! Same store and expiry policy as the storefront, but its own cookie with
//! `SameSite=Strict`, so a storefront session never authenticates here.

use bazaar_storefront::middleware::{CookieSettings, configure_session_layer};
use sqlx::PgPool;
use tower_sessions::SessionManagerLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

/// Admin session cookie name.
pub const ADMIN_SESSION_COOKIE_NAME: &str = "bazaar_admin_session";

/// Cookie settings for the admin panel.
#[must_use]
pub fn admin_cookie(config: &AdminConfig) -> CookieSettings {
    CookieSettings {
        name: ADMIN_SESSION_COOKIE_NAME,
        secure: config.is_https(),
        same_site: SameSite::Strict,
    }
}

/// Create the admin session layer with `PostgreSQL` store.
#[must_use]
pub fn create_session_layer(pool: &PgPool, config: &AdminConfig) -> SessionManagerLayer<PostgresStore> {
    configure_session_layer(PostgresStore::new(pool.clone()), admin_cookie(config))
}
