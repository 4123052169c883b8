//! Session-related types.
//!
//! Types stored in the session for authentication and shopping state.

use serde::{Deserialize, Serialize};

use bazaar_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role at login time.
    pub role: UserRole,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart (`bazaar_core::Cart`).
    pub const CART: &str = "cart";

    /// Key for recently viewed product ids, most recent first.
    pub const RECENTLY_VIEWED: &str = "recently_viewed";
}
