//! Category route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::CategoryRepository;
use crate::error::Result;
use crate::models::catalog::CategoryWithCount;
use crate::state::AppState;

/// All categories with their in-stock product counts.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<CategoryWithCount>>> {
    let categories = CategoryRepository::new(state.pool())
        .list_with_counts(true, None)
        .await?;
    Ok(Json(categories))
}
