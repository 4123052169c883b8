//! Account route handlers (requires authentication).
//!
//! The profile form has two independent groups. The account group holds the
//! name and email; the contact group holds phone and address. Each group is
//! validated and saved on its own and reports its own outcome.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::Email;

use crate::db::{RepositoryError, UserRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, User, UserProfile, WishlistEntry};
use crate::routes::extract::{ApiJson, MultipartForm};
use crate::routes::phone_errors;
use crate::services::media::MediaKind;
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 150;

/// The signed-in user with their profile.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub profile: UserProfile,
}

/// Profile update. Absent fields keep their current values; a group with no
/// fields present is left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    const fn has_account_fields(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.email.is_some()
    }

    const fn has_contact_fields(&self) -> bool {
        self.phone.is_some() || self.address.is_some()
    }
}

/// What happened to one form group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Updated,
    Invalid,
    Unchanged,
}

/// Outcome of one form group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub status: GroupStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl GroupOutcome {
    const fn updated() -> Self {
        Self {
            status: GroupStatus::Updated,
            errors: Vec::new(),
        }
    }

    const fn unchanged() -> Self {
        Self {
            status: GroupStatus::Unchanged,
            errors: Vec::new(),
        }
    }

    const fn invalid(errors: Vec<String>) -> Self {
        Self {
            status: GroupStatus::Invalid,
            errors,
        }
    }
}

/// Response of `POST /account/profile`.
#[derive(Debug, Serialize)]
pub struct ProfileUpdateResult {
    #[serde(flatten)]
    pub view: ProfileView,
    pub account: GroupOutcome,
    pub contact: GroupOutcome,
}

#[derive(Debug, PartialEq, Eq)]
struct AccountFields {
    first_name: String,
    last_name: String,
    email: Email,
}

#[derive(Debug, PartialEq, Eq)]
struct ContactFields {
    phone: String,
    address: String,
}

fn validate_account(
    update: &ProfileUpdate,
    current: &User,
) -> std::result::Result<AccountFields, Vec<String>> {
    let mut errors = Vec::new();

    let first_name = update
        .first_name
        .as_deref()
        .map_or_else(|| current.first_name.clone(), |v| v.trim().to_owned());
    let last_name = update
        .last_name
        .as_deref()
        .map_or_else(|| current.last_name.clone(), |v| v.trim().to_owned());

    for (field, value) in [("first_name", &first_name), ("last_name", &last_name)] {
        if value.chars().count() > MAX_NAME_LENGTH {
            errors.push(format!("{field} must be at most {MAX_NAME_LENGTH} characters"));
        }
    }

    let email = match update.email.as_deref() {
        Some(raw) => match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(format!("email: {e}"));
                None
            }
        },
        None => Some(current.email.clone()),
    };

    match email {
        Some(email) if errors.is_empty() => Ok(AccountFields {
            first_name,
            last_name,
            email,
        }),
        _ => Err(errors),
    }
}

fn validate_contact(
    update: &ProfileUpdate,
    current: &UserProfile,
) -> std::result::Result<ContactFields, Vec<String>> {
    let phone = update
        .phone
        .as_deref()
        .map_or_else(|| current.phone.clone(), |v| v.trim().to_owned());
    let address = update
        .address
        .as_deref()
        .map_or_else(|| current.address.clone(), |v| v.trim().to_owned());

    let errors = phone_errors(&phone);
    if errors.is_empty() {
        Ok(ContactFields { phone, address })
    } else {
        Err(errors)
    }
}

async fn load_user(state: &AppState, current: &CurrentUser) -> Result<User> {
    UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
}

/// The signed-in user's account and profile.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<ProfileView>> {
    let user = load_user(&state, &current).await?;
    let profile = UserRepository::new(state.pool())
        .get_profile(current.id)
        .await?;
    Ok(Json(ProfileView { user, profile }))
}

/// Update the account and contact groups independently.
///
/// Responds 400 only when every submitted group was rejected.
#[instrument(skip(state, session, current, update), fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<(StatusCode, Json<ProfileUpdateResult>)> {
    let users = UserRepository::new(state.pool());
    let mut user = load_user(&state, &current).await?;
    let mut profile = users.get_profile(current.id).await?;

    let account = if update.has_account_fields() {
        match validate_account(&update, &user) {
            Ok(fields) => {
                match users
                    .update_account(current.id, &fields.first_name, &fields.last_name, &fields.email)
                    .await
                {
                    Ok(updated) => {
                        user = updated;
                        GroupOutcome::updated()
                    }
                    Err(RepositoryError::Conflict(_)) => GroupOutcome::invalid(vec![
                        "email is already used by another account".to_string(),
                    ]),
                    Err(e) => return Err(e.into()),
                }
            }
            Err(errors) => GroupOutcome::invalid(errors),
        }
    } else {
        GroupOutcome::unchanged()
    };

    let contact = if update.has_contact_fields() {
        match validate_contact(&update, &profile) {
            Ok(fields) => {
                profile = users
                    .update_contact(current.id, &fields.phone, &fields.address)
                    .await?;
                GroupOutcome::updated()
            }
            Err(errors) => GroupOutcome::invalid(errors),
        }
    } else {
        GroupOutcome::unchanged()
    };

    if account.status == GroupStatus::Updated && user.email != current.email {
        set_current_user(
            &session,
            &CurrentUser {
                email: user.email.clone(),
                ..current
            },
        )
        .await?;
    }

    let status = response_status(&account, &contact);
    Ok((
        status,
        Json(ProfileUpdateResult {
            view: ProfileView { user, profile },
            account,
            contact,
        }),
    ))
}

fn response_status(account: &GroupOutcome, contact: &GroupOutcome) -> StatusCode {
    let submitted = [account, contact]
        .into_iter()
        .filter(|g| g.status != GroupStatus::Unchanged);
    let mut any = false;
    let mut all_invalid = true;
    for group in submitted {
        any = true;
        all_invalid &= group.status == GroupStatus::Invalid;
    }
    if any && all_invalid {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    }
}

/// Replace the profile photo (multipart field `photo`).
#[instrument(skip(state, current, multipart), fields(user_id = %current.id))]
pub async fn upload_photo(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    multipart: Multipart,
) -> Result<Json<UserProfile>> {
    let mut form = MultipartForm::read(multipart, "photo").await?;
    let data = form
        .take_file()
        .ok_or_else(|| AppError::BadRequest("photo is required".to_string()))?;

    let media = state.media();
    let path = media.store_image(MediaKind::ProfilePhoto, &data).await?;

    let users = UserRepository::new(state.pool());
    let previous = match users.set_photo(current.id, &path).await {
        Ok(previous) => previous,
        Err(err) => {
            if let Err(e) = media.delete(&path).await {
                tracing::warn!(error = %e, path = %path, "Failed to remove orphaned photo");
            }
            return Err(err.into());
        }
    };

    if let Some(old) = previous.filter(|old| *old != path) {
        if let Err(e) = media.delete(&old).await {
            tracing::warn!(error = %e, path = %old, "Failed to remove previous photo");
        }
    }

    Ok(Json(users.get_profile(current.id).await?))
}

/// The signed-in user's wishlist.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn wishlist(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<WishlistEntry>>> {
    let entries = WishlistRepository::new(state.pool())
        .list(current.id)
        .await?;
    Ok(Json(entries))
}
