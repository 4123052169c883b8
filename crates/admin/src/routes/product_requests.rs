//! Customer product requests.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use bazaar_storefront::db::ProductRequestRepository;
use bazaar_storefront::error::Result;
use bazaar_storefront::models::ProductRequest;

use crate::middleware::RequireStaff;
use crate::routes::ListParams;
use crate::state::AdminState;

/// Requests newest first.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProductRequest>>> {
    let requests = ProductRequestRepository::new(state.pool())
        .list(params.limit(), params.offset())
        .await?;
    Ok(Json(requests))
}
