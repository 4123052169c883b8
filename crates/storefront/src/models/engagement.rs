//! Reviews, wishlists, product requests and newsletter subscribers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{
    Email, Price, ProductId, ProductRequestId, Rating, ReviewId, SubscriberId, UserId,
};

use super::catalog::Product;

/// A product review.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Reviewer display name.
    pub author: String,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub image: Option<String>,
    pub verified_purchase: bool,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Aggregate rating for a product.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewStats {
    /// Mean rating rounded to one decimal place; `None` when unreviewed.
    pub average: Option<Decimal>,
    pub count: i64,
}

/// A wishlisted product.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    pub product: Product,
    pub added_at: DateTime<Utc>,
}

/// A customer's request to stock something new.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRequest {
    pub id: ProductRequestId,
    pub user_id: Option<UserId>,
    pub product_name: String,
    pub details: String,
    pub desired_price: Option<Price>,
    pub reference_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A newsletter subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct NewsletterSubscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub subscribed: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}
