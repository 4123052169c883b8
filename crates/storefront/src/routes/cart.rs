//! Cart route handlers.
//!
//! The cart lives in the session; while a user is signed in every change is
//! mirrored to their persisted cart.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::catalog::Product;
use crate::routes::extract::ApiJson;
use crate::services::cart::{CartStore, CartSummary, add_to_cart, update_in_cart};
use crate::state::AppState;

/// Body of `POST /cart/add`.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Body of `POST /cart/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateCart {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /cart/remove`.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    pub product_id: ProductId,
}

/// Response of `POST /cart/add`.
#[derive(Debug, Serialize)]
pub struct Added {
    pub added: u32,
    pub item_count: u64,
}

/// Response of `GET /cart/count`.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u64,
}

async fn find_product(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))
}

/// Show the cart priced at current catalog prices.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartSummary>> {
    let store = CartStore::new(state.pool(), &session);
    Ok(Json(store.summary(user.map(|u| u.id)).await?))
}

/// Add a product to the cart.
///
/// The quantity defaults to 1 and is clamped to the stock not already in
/// the cart.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    ApiJson(body): ApiJson<AddToCart>,
) -> Result<Json<Added>> {
    let product = find_product(&state, body.product_id).await?;
    let store = CartStore::new(state.pool(), &session);

    let mut cart = store.load().await?;
    let added = add_to_cart(&mut cart, &product, body.quantity.unwrap_or(1))?;
    store.save(user.map(|u| u.id), &cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", &product.id.to_string())]),
    );

    Ok(Json(Added {
        added,
        item_count: cart.item_count(),
    }))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    ApiJson(body): ApiJson<UpdateCart>,
) -> Result<Json<CartSummary>> {
    let product = find_product(&state, body.product_id).await?;
    let user_id = user.map(|u| u.id);
    let store = CartStore::new(state.pool(), &session);

    let mut cart = store.load().await?;
    update_in_cart(&mut cart, &product, body.quantity)?;
    store.save(user_id, &cart).await?;

    Ok(Json(store.summary(user_id).await?))
}

/// Remove a line from the cart. Removing an absent line is not an error.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    ApiJson(body): ApiJson<RemoveFromCart>,
) -> Result<Json<CartSummary>> {
    let user_id = user.map(|u| u.id);
    let store = CartStore::new(state.pool(), &session);

    let mut cart = store.load().await?;
    if cart.remove(body.product_id) {
        store.save(user_id, &cart).await?;
    }

    Ok(Json(store.summary(user_id).await?))
}

/// Total quantity of items in the cart.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<CartCount>> {
    let cart = CartStore::new(state.pool(), &session).load().await?;
    Ok(Json(CartCount {
        count: cart.item_count(),
    }))
}
