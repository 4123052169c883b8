//! HTTP route handlers for admin.
//!
//! Reads need a staff session (viewer or admin); writes need an admin.
//!
//! # Route Structure
//!
//! ```text
//! POST   /auth/login               - Staff sign-in
//! POST   /auth/logout              - Sign out
//!
//! GET    /categories               - Categories with product counts
//! POST   /categories               - Create
//! GET    /categories/{id}          - Show
//! PUT    /categories/{id}          - Edit
//! DELETE /categories/{id}          - Delete (409 while products have orders)
//!
//! GET    /products                 - Listing (q, category, min_price, max_price, sort, page)
//! POST   /products                 - Create
//! GET    /products/{id}            - Show
//! PUT    /products/{id}            - Edit
//! DELETE /products/{id}            - Delete (409 while order lines reference it)
//! POST   /products/{id}/image      - Replace image (multipart)
//!
//! GET    /orders                   - Orders (status, limit, offset)
//! GET    /orders/{id}              - Order with lines
//! POST   /orders/{id}/status       - Status transition
//! DELETE /orders/{id}              - Delete
//!
//! GET    /users                    - Accounts
//! DELETE /users/{id}               - Delete account
//! GET    /product-requests         - Customer product requests
//! GET    /newsletter               - Subscribers (active)
//! ```

pub mod auth;
pub mod categories;
pub mod newsletter;
pub mod orders;
pub mod product_requests;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post},
};
use serde::Deserialize;

use bazaar_storefront::error::{AppError, Result};
use bazaar_storefront::middleware::auth_rate_limiter;

use crate::state::AdminState;

/// Longest accepted category or product name.
const MAX_NAME_CHARS: usize = 200;

/// Rows returned when no limit is given.
const DEFAULT_LIMIT: u32 = 50;

/// Trimmed, non-empty name of at most [`MAX_NAME_CHARS`] characters.
pub(crate) fn required_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_owned())
}

/// `limit` and `offset` query parameters. Unparseable values fall back to
/// the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_LIMIT)
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AdminState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route_layer(auth_rate_limiter())
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AdminState> {
    Router::new()
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/image", post(products::upload_image))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AdminState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show).delete(orders::delete))
        .route("/{id}/status", post(orders::set_status))
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AdminState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/orders", order_routes())
        .route("/users", get(users::index))
        .route("/users/{id}", delete(users::delete))
        .route("/product-requests", get(product_requests::index))
        .route("/newsletter", get(newsletter::index))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_name() {
        assert_eq!(required_name("  Mugs ").unwrap(), "Mugs");
        assert!(required_name("   ").is_err());
        assert!(required_name(&"x".repeat(201)).is_err());
        assert!(required_name(&"é".repeat(200)).is_ok());
    }

    #[test]
    fn test_list_params_defaults() {
        let params = ListParams::default();
        assert_eq!(params.limit(), DEFAULT_LIMIT);
        assert_eq!(params.offset(), 0);

        let params = ListParams {
            limit: Some("20".to_owned()),
            offset: Some("abc".to_owned()),
        };
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);
    }
}
