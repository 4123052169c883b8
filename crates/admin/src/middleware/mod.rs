//! HTTP middleware for admin.
//!
//! Request ids and security headers come from the storefront crate; the
//! session cookie and the role extractors are admin-specific.

pub mod auth;
pub mod session;

pub use auth::{RequireAdmin, RequireStaff, set_current_staff};
pub use session::{admin_cookie, create_session_layer};
