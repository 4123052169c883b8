//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, Price, ProductId, Slug};

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A category together with how many products it holds.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub short_description: String,
    pub price: Price,
    pub stock: u32,
    pub featured: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceLow,
    PriceHigh,
    #[default]
    Name,
    Newest,
    /// Highest average rating first, unrated last.
    Rating,
}

impl ProductSort {
    /// Parse a `sort` query value; anything unknown falls back to name order.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("price_low") => Self::PriceLow,
            Some("price_high") => Self::PriceHigh,
            Some("newest") => Self::Newest,
            Some("rating") => Self::Rating,
            _ => Self::Name,
        }
    }

    /// `ORDER BY` clause for the listing query. Every arm ends on a unique key
    /// so pagination is stable.
    pub(crate) const fn order_by(self) -> &'static str {
        match self {
            Self::PriceLow => "p.price ASC, p.name ASC, p.id ASC",
            Self::PriceHigh => "p.price DESC, p.name ASC, p.id ASC",
            Self::Name => "p.name ASC, p.id ASC",
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::Rating => "avg_rating DESC NULLS LAST, p.name ASC, p.id ASC",
        }
    }
}

/// Validated listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive match against name and both descriptions.
    pub query: Option<String>,
    pub category: Option<Slug>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub sort: ProductSort,
    /// Hide products with zero stock.
    pub in_stock_only: bool,
}

/// One page of listing results.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: i64,
}
