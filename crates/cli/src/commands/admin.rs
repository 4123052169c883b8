//! Staff account management.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin (password from the flag or BAZAAR_ADMIN_PASSWORD)
//! bazaar-cli admin create -e admin@example.com -n "Ada Lovelace" -r admin -p '...'
//!
//! # Promote an existing customer to read-only staff
//! bazaar-cli admin create -e ops@example.com -n "Ops" -r viewer
//! ```

use bazaar_core::{Email, UserId, UserRole};
use bazaar_storefront::db::users::NewUser;
use bazaar_storefront::db::{RepositoryError, UserRepository};
use bazaar_storefront::services::auth::{AuthError, hash_password, validate_password};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: viewer, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// A new account needs a password.
    #[error("A password is required to create {0}")]
    PasswordRequired(String),

    #[error(transparent)]
    Password(#[from] AuthError),
}

/// Parse a staff role. Customers are not staff.
fn parse_staff_role(raw: &str) -> Result<UserRole, AdminError> {
    raw.parse::<UserRole>()
        .ok()
        .filter(|role| role.is_staff())
        .ok_or_else(|| AdminError::InvalidRole(raw.to_owned()))
}

/// Split a display name into first and last name at the first space.
fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
        None => (name.to_owned(), String::new()),
    }
}

/// Create a staff account, or promote an existing account to `role`.
///
/// For an existing account the password is only replaced when one is given.
///
/// # Returns
///
/// The id of the account.
///
/// # Errors
///
/// Returns an error for an invalid role, email or password, or if the
/// database operation fails.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: Option<&str>,
) -> Result<UserId, AdminError> {
    let role = parse_staff_role(role)?;
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    if let Some(password) = password {
        validate_password(password)?;
    }

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if let Some(existing) = users.get_by_email(&email).await? {
        users.set_role(existing.id, role).await?;
        if let Some(password) = password {
            users.set_password_hash(existing.id, &hash_password(password)?).await?;
        }
        tracing::info!(user_id = %existing.id, %role, "Existing account updated");
        return Ok(existing.id);
    }

    let password = password.ok_or_else(|| AdminError::PasswordRequired(email.to_string()))?;
    let (first_name, last_name) = split_name(name);
    let user = users
        .create_with_password(
            &NewUser {
                email,
                first_name,
                last_name,
                role,
                phone: String::new(),
                address: String::new(),
            },
            &hash_password(password)?,
        )
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, %role, "Staff account created");
    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_staff_role() {
        assert_eq!(parse_staff_role("admin").unwrap(), UserRole::Admin);
        assert_eq!(parse_staff_role("viewer").unwrap(), UserRole::Viewer);
        assert!(matches!(
            parse_staff_role("customer"),
            Err(AdminError::InvalidRole(_))
        ));
        assert!(parse_staff_role("root").is_err());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name(" Ada  Lovelace "),
            ("Ada".to_owned(), "Lovelace".to_owned())
        );
        assert_eq!(split_name("Ops"), ("Ops".to_owned(), String::new()));
    }
}
