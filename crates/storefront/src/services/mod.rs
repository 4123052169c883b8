//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login (argon2id)
//! - `cart` - Session cart with write-through persistence
//! - `catalog` - Listing filters, pagination, recently viewed
//! - `checkout` - Stock-locked order placement
//! - `media` - Image upload storage

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod media;
