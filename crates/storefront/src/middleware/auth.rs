//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Message for requests that need a signed-in user.
pub const SIGN_IN_REQUIRED: &str = "Sign in required";

async fn session_user(parts: &Parts) -> Result<Option<CurrentUser>, AppError> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

    Ok(session.get(session_keys::CURRENT_USER).await?)
}

/// Extractor that requires a signed-in user.
///
/// Rejects with 401 `{"error": "Sign in required"}` when nobody is logged
/// in. A failing session store is a 500, never "not signed in".
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized(SIGN_IN_REQUIRED.to_string()))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts).await.map(Self)
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use bazaar_core::{Email, UserId, UserRole};
    use http_body_util::BodyExt;
    use tower_sessions::MemoryStore;

    use super::*;

    fn parts_with_session() -> (Parts, Session) {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let (mut parts, ()) = Request::get("/orders").body(()).unwrap().into_parts();
        parts.extensions.insert(session.clone());
        (parts, session)
    }

    #[tokio::test]
    async fn test_anonymous_request_gets_json_401() {
        let (mut parts, _session) = parts_with_session();
        let Err(err) = RequireAuth::from_request_parts(&mut parts, &()).await else {
            panic!("anonymous request was accepted");
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": SIGN_IN_REQUIRED }));
    }

    #[tokio::test]
    async fn test_signed_in_user_is_extracted() {
        let (mut parts, session) = parts_with_session();
        let user = CurrentUser {
            id: UserId::new(7),
            email: Email::parse("shopper@example.com").unwrap(),
            role: UserRole::Customer,
        };
        set_current_user(&session, &user).await.unwrap();

        let RequireAuth(found) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.id, UserId::new(7));

        let OptionalAuth(found) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_a_server_error() {
        let (mut parts, ()) = Request::get("/orders").body(()).unwrap().into_parts();
        let Err(err) = OptionalAuth::from_request_parts(&mut parts, &()).await else {
            panic!("extracted without a session layer");
        };
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
