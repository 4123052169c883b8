//! Authentication extractors for admin.
//!
//! Staff (viewer or admin) may read; only admins may write. Both extractors
//! reject with the shared JSON error body: 401 when nobody is signed in,
//! 403 when the role is insufficient.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bazaar_storefront::error::AppError;
use bazaar_storefront::models::CurrentUser;

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the signed-in staff member.
    pub const CURRENT_STAFF: &str = "current_staff";
}

async fn current_staff(parts: &Parts) -> Result<CurrentUser, AppError> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

    let staff: CurrentUser = session
        .get(keys::CURRENT_STAFF)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))?;

    check_role(staff, false)
}

fn check_role(user: CurrentUser, write: bool) -> Result<CurrentUser, AppError> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden("Staff access required".to_string()));
    }
    if write && !user.role.can_write() {
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }
    Ok(user)
}

/// Extractor for read access: any signed-in staff member.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_orders(RequireStaff(staff): RequireStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.email)
/// }
/// ```
pub struct RequireStaff(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_staff(parts).await.map(Self)
    }
}

/// Extractor for write access: a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let staff = current_staff(parts).await?;
        check_role(staff, true).map(Self)
    }
}

/// Helper to set the signed-in staff member in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_STAFF, staff).await
}
