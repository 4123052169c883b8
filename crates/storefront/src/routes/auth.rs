//! Authentication route handlers.
//!
//! Registration and login both end with an authenticated session: the
//! session id is cycled, the user is stored in it and the anonymous cart is
//! merged into the user's persisted cart.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::extract::ApiJson;
use crate::services::auth::{AuthService, Registration};
use crate::services::cart::CartStore;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

async fn establish_session(state: &AppState, session: &Session, user: &User) -> Result<()> {
    session.cycle_id().await?;

    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(session, &current).await?;

    CartStore::new(state.pool(), session)
        .merge_on_login(user.id)
        .await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create a customer account and sign it in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<Registration>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool()).register(&form).await?;
    establish_session(&state, &session, &user).await?;

    tracing::info!(user_id = %user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in with email and password.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await?;
    establish_session(&state, &session, &user).await?;

    tracing::info!(user_id = %user.id, "Customer logged in");
    Ok(Json(user))
}

/// Sign out and drop the whole session, cart included.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
