//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The admin binary
//! builds its own layer through [`configure_session_layer`] with a different
//! cookie name and a stricter `SameSite` policy.

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Cookie settings that differ between the storefront and admin.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub name: &'static str,
    pub secure: bool,
    pub same_site: SameSite,
}

/// Apply the shared cookie and expiry policy to any session store.
#[must_use]
pub fn configure_session_layer<S: SessionStore>(
    store: S,
    cookie: CookieSettings,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(cookie.name)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(cookie.secure)
        .with_same_site(cookie.same_site)
        .with_http_only(true)
        .with_path("/")
}

/// Create the storefront session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the storefront migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    configure_session_layer(
        store,
        CookieSettings {
            name: SESSION_COOKIE_NAME,
            secure: config.is_https(),
            same_site: SameSite::Lax,
        },
    )
}
