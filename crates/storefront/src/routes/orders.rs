//! Order history and payment.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bazaar_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::order::{Order, OrderWithItems};
use crate::state::AppState;

/// The signed-in user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// One of the user's orders. Orders of other users are reported as missing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {id}")))
}

/// Simulated payment: a pending order becomes paid.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .transition(id, Some(user.id), OrderStatus::Paid)
        .await
        .map_err(|err| match err {
            RepositoryError::NotFound => AppError::NotFound(format!("Order not found: {id}")),
            RepositoryError::Conflict(_) => {
                AppError::Conflict("Order already processed.".to_string())
            }
            other => other.into(),
        })?;

    add_breadcrumb("order", "Order paid", Some(&[("order_id", &id.to_string())]));
    tracing::info!(order_id = %id, "Order paid");

    Ok(Json(order))
}
