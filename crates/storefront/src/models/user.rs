//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId, UserRole};

/// A shop account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name, or the email when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.to_string()
        } else {
            full.to_owned()
        }
    }
}

/// Contact details and photo attached to an account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfile {
    /// Media path of the profile photo.
    pub photo: Option<String>,
    pub phone: String,
    pub address: String,
}
