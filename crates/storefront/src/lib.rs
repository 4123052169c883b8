//! Bazaar storefront library.
//!
//! This crate provides the storefront functionality as a library, allowing
//! it to be tested and reused by the admin binary and the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::services::media::MEDIA_URL_PREFIX;
use crate::state::AppState;

/// Room for multipart framing and text fields on top of the file itself.
const BODY_LIMIT_MARGIN: usize = 64 * 1024;

/// Build the storefront router.
///
/// The session store is a parameter so tests can run against an in-memory
/// store; the binary passes the `PostgreSQL` layer.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let body_limit = state.media().max_bytes() + BODY_LIMIT_MARGIN;
    let media = ServeDir::new(state.media().root());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service(MEDIA_URL_PREFIX, media)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
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

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;

    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;
    use tower_sessions::cookie::SameSite;

    use super::*;
    use crate::config::{MediaConfig, SentryConfig, StorefrontConfig};
    use crate::middleware::{CookieSettings, configure_session_layer};

    /// The router over a pool that never connects.
    fn offline_app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused"),
            host: Ipv4Addr::LOCALHOST.into(),
            port: 3000,
            base_url: "http://localhost:3000".parse().unwrap(),
            session_secret: SecretString::from("k9#Qz!2vLp8@Xw4$Rt6^Yh1&Bn3*Md7%"),
            media: MediaConfig::default(),
            sentry: SentryConfig::default(),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://bazaar@127.0.0.1:1/offline")
            .unwrap();
        let sessions = configure_session_layer(
            MemoryStore::default(),
            CookieSettings {
                name: "test_session",
                secure: false,
                same_site: SameSite::Lax,
            },
        );
        app(AppState::new(config, pool), sessions)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = offline_app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymous_cart_count_is_zero() {
        let response = offline_app().oneshot(get("/cart/count")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "count": 0 }));
    }

    #[tokio::test]
    async fn test_protected_routes_answer_401_json() {
        let app = offline_app();
        for (method, uri) in [
            ("GET", "/orders"),
            ("GET", "/orders/1"),
            ("POST", "/orders/1/pay"),
            ("POST", "/checkout"),
            ("GET", "/account/profile"),
            ("GET", "/account/wishlist"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("x-forwarded-for", "203.0.113.20")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(
                body_json(response).await,
                serde_json::json!({ "error": "Sign in required" })
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = offline_app().oneshot(get("/no-such-page")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_is_rate_limited_per_client() {
        let app = offline_app();
        let login = |ip: &str| {
            Request::post("/auth/login")
                .header("x-forwarded-for", ip)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap()
        };

        // Malformed bodies are rejected before any database access.
        for _ in 0..5 {
            let response = app.clone().oneshot(login("198.51.100.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        let response = app.clone().oneshot(login("198.51.100.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(login("198.51.100.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
