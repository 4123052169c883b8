//! Admin sign-in with email and password.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_storefront::error::{Result, clear_sentry_user, set_sentry_user};
use bazaar_storefront::models::{CurrentUser, User};
use bazaar_storefront::routes::extract::ApiJson;
use bazaar_storefront::services::auth::AuthService;

use crate::middleware::set_current_staff;
use crate::state::AdminState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign in. Only viewer and admin accounts are accepted.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AdminState>,
    session: Session,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login_staff(&form.email, &form.password)
        .await?;

    session.cycle_id().await?;
    set_current_staff(
        &session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        },
    )
    .await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    tracing::info!(user_id = %user.id, role = %user.role, "Staff logged in");
    Ok(Json(user))
}

/// Sign out.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
