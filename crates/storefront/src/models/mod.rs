//! Domain models for the storefront.
//!
//! These are the validated shapes handlers and services work with. Row types
//! stay private to the `db` modules and convert into these.

pub mod catalog;
pub mod engagement;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{Category, CategoryWithCount, Product, ProductFilter, ProductPage, ProductSort};
pub use engagement::{NewsletterSubscriber, ProductRequest, Review, ReviewStats, WishlistEntry};
pub use order::{Order, OrderItem, OrderWithItems};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{User, UserProfile};
