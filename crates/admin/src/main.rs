//! Bazaar Admin - staff JSON API.
//!
//! This binary serves the admin panel on port 3001. It talks to the same
//! database as the storefront and shares its process setup.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_admin::config::AdminConfig;
use bazaar_admin::state::AdminState;
use bazaar_admin::{app, middleware};
use bazaar_storefront::{db, telemetry};

#[tokio::main]
async fn main() {
    let config = AdminConfig::from_env().expect("Failed to load configuration");

    let _sentry_guard = telemetry::init_sentry(&config.sentry);
    telemetry::init_tracing("bazaar_admin=info,bazaar_storefront=info,tower_http=info");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let session_layer = middleware::create_session_layer(&pool, &config);
    let addr = config.socket_addr();
    let state = AdminState::new(config, pool);

    telemetry::serve(app(state, session_layer), addr, "admin")
        .await
        .expect("Admin server error");
}
