//! Bazaar admin library.
//!
//! Staff-facing JSON API for catalog, order and account management. It
//! shares the storefront's database, repositories and error type, and keeps
//! its own session cookie.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
};
use bazaar_storefront::middleware::{request_id_middleware, security_headers_middleware};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::state::AdminState;

/// Room for multipart framing on top of the image itself.
const BODY_LIMIT_MARGIN: usize = 64 * 1024;

/// Build the admin router.
pub fn app<S>(state: AdminState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let body_limit = state.media().max_bytes() + BODY_LIMIT_MARGIN;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "admin_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AdminState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
