//! Customer and staff accounts.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use bazaar_core::UserId;
use bazaar_storefront::db::UserRepository;
use bazaar_storefront::error::{AppError, Result};
use bazaar_storefront::models::User;

use crate::middleware::{RequireAdmin, RequireStaff};
use crate::routes::ListParams;
use crate::state::AdminState;

/// Accounts newest first.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.pool())
        .list(params.limit(), params.offset())
        .await?;
    Ok(Json(users))
}

/// Delete an account. Admins cannot delete themselves.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::Conflict(
            "You cannot delete your own account".to_string(),
        ));
    }
    UserRepository::new(state.pool()).delete(id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
