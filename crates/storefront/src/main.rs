//! Bazaar Storefront - public JSON API.
//!
//! This binary serves the storefront on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework serving JSON
//! - `PostgreSQL` for the catalog, carts, orders and sessions
//! - Uploaded images on local disk, served under `/media`
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p bazaar-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::state::AppState;
use bazaar_storefront::{app, db, middleware, telemetry};

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Sentry must be up before the subscriber so its tracing layer has a client
    let _sentry_guard = telemetry::init_sentry(&config.sentry);
    telemetry::init_tracing("bazaar_storefront=info,tower_http=info");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let session_layer = middleware::create_session_layer(&pool, &config);
    let addr = config.socket_addr();
    let state = AppState::new(config, pool);

    telemetry::serve(app(state, session_layer), addr, "storefront")
        .await
        .expect("Server error");
}
