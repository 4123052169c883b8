//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod rating;
pub mod slug;
pub mod status;

pub use cart::{Cart, CartError, CartLine};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError};
pub use slug::{Slug, SlugError, slugify};
pub use status::*;
