//! Order management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{OrderId, OrderStatus};
use bazaar_storefront::db::OrderRepository;
use bazaar_storefront::error::{AppError, Result};
use bazaar_storefront::models::{Order, OrderWithItems};
use bazaar_storefront::routes::extract::ApiJson;

use crate::middleware::{RequireAdmin, RequireStaff};
use crate::routes::ListParams;
use crate::state::AdminState;

/// Order listing query.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    #[serde(flatten)]
    pub list: ListParams,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("unknown order status: {raw}")))
}

/// Orders newest first, optionally filtered by status.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_status(raw)?),
    };
    let orders = OrderRepository::new(state.pool())
        .list(status, query.list.limit(), query.list.offset())
        .await?;
    Ok(Json(orders))
}

/// An order with its lines.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {id}")))
}

/// Move an order along the status machine.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn set_status(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    ApiJson(body): ApiJson<StatusChange>,
) -> Result<Json<Order>> {
    let next = parse_status(&body.status)?;
    let order = OrderRepository::new(state.pool())
        .transition(id, None, next)
        .await?;
    tracing::info!(order_id = %id, status = %order.status, "Order status changed");
    Ok(Json(order))
}

/// Delete an order. Stock is not given back.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    OrderRepository::new(state.pool()).delete(id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(" shipped ").unwrap(), OrderStatus::Shipped);
        assert!(matches!(parse_status("lost"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_list_query_flattens_paging() {
        let query: OrderListQuery =
            serde_json::from_value(serde_json::json!({ "status": "paid", "limit": "10" }))
                .unwrap();
        assert_eq!(query.status.as_deref(), Some("paid"));
        assert_eq!(query.list.limit(), 10);
        assert_eq!(query.list.offset(), 0);
    }
}
