//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `storefront` - Public-facing shop (catalog, cart, checkout, accounts)
//! - `admin` - Staff panel for catalog and order management
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Cart arithmetic and the order status machine live here so
//! both binaries share one definition.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, slugs, ratings, statuses and the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
