//! HTTP route handlers for storefront.
//!
//! Every handler speaks JSON. Errors are `{"error": "..."}` with a status
//! code from [`AppError`](crate::error::AppError).
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /categories                - Categories with product counts
//!
//! # Products
//! GET  /products                  - Listing (q, category, min_price, max_price, sort, page)
//! GET  /products/{slug}           - Product detail
//! POST /products/{slug}/reviews   - Submit a review (multipart, requires auth)
//!
//! # Cart
//! GET  /cart                      - Cart summary
//! POST /cart/add                  - Add to cart
//! POST /cart/update               - Set a line quantity
//! POST /cart/remove               - Remove a line
//! GET  /cart/count                - Total item quantity
//!
//! # Checkout and orders (requires auth)
//! POST /checkout                  - Place an order
//! GET  /orders                    - Order history
//! GET  /orders/{id}               - Order detail
//! POST /orders/{id}/pay           - Simulated payment
//!
//! # Auth
//! POST /auth/register             - Register and sign in
//! POST /auth/login                - Sign in
//! POST /auth/logout               - Sign out
//!
//! # Account (requires auth)
//! GET  /account/profile           - Account and profile
//! POST /account/profile           - Update account and contact groups
//! POST /account/photo             - Upload profile photo (multipart)
//! GET  /account/wishlist          - Wishlist
//! POST /wishlist/{product_id}     - Add to wishlist
//! DELETE /wishlist/{product_id}   - Remove from wishlist
//!
//! # Engagement
//! POST /product-requests          - Request a product (multipart)
//! POST /newsletter/subscribe      - Subscribe
//! POST /newsletter/unsubscribe    - Unsubscribe
//! POST /contact                   - Contact form
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod contact;
pub mod extract;
pub mod home;
pub mod newsletter;
pub mod orders;
pub mod product_requests;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Longest phone number a profile or order can hold.
pub(crate) const MAX_PHONE_LENGTH: usize = 20;

/// Problems with a trimmed phone number. Empty means it is acceptable;
/// a blank number is allowed.
pub(crate) fn phone_errors(phone: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if phone.chars().count() > MAX_PHONE_LENGTH {
        errors.push(format!("phone must be at most {MAX_PHONE_LENGTH} characters"));
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
    {
        errors.push("phone may only contain digits, spaces and + - ( )".to_string());
    }
    errors
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route_layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
        .route("/{slug}/reviews", post(products::create_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout and order routes router.
pub fn order_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/checkout", post(checkout::checkout))
        .route("/orders/{id}/pay", post(orders::pay))
        .route_layer(checkout_rate_limiter());

    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .merge(limited)
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(account::profile).post(account::update_profile),
        )
        .route("/photo", post(account::upload_photo))
        .route("/wishlist", get(account::wishlist))
}

/// Create the newsletter routes router.
pub fn newsletter_routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(newsletter::subscribe))
        .route("/unsubscribe", post(newsletter::unsubscribe))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        .route("/categories", get(categories::index))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout and order history
        .merge(order_routes())
        // Auth routes
        .nest("/auth", auth_routes())
        // Account routes
        .nest("/account", account_routes())
        .route(
            "/wishlist/{product_id}",
            post(wishlist::add).delete(wishlist::remove),
        )
        .route("/product-requests", post(product_requests::create))
        .nest("/newsletter", newsletter_routes())
        .route("/contact", post(contact::submit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_errors() {
        assert!(phone_errors("").is_empty());
        assert!(phone_errors("+1 (555) 010-0100").is_empty());
        assert_eq!(phone_errors("call me").len(), 1);
        assert_eq!(phone_errors("+1 555 0100 0100 0100 0100 0100").len(), 1);
        assert_eq!(phone_errors(&"x".repeat(MAX_PHONE_LENGTH + 1)).len(), 2);
    }
}
