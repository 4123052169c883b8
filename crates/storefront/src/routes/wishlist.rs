//! Wishlist route handlers (requires authentication).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::{ProductRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Result of adding to the wishlist.
#[derive(Debug, Serialize)]
pub struct WishlistAdded {
    /// `false` when the product was already on the list.
    pub added: bool,
}

/// Add a product to the wishlist. Adding twice is a no-op.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<(StatusCode, Json<WishlistAdded>)> {
    if ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!("Product not found: {product_id}")));
    }

    let added = WishlistRepository::new(state.pool())
        .add(user.id, product_id)
        .await?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(WishlistAdded { added })))
}

/// Remove a product from the wishlist.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    let removed = WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Product is not on your wishlist".to_string()))
    }
}
