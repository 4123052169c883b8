//! Catalog listing: query parsing, pagination and recently viewed products.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_sessions::Session;

use bazaar_core::{Price, ProductId, Slug};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::catalog::{ProductFilter, ProductPage, ProductSort};
use crate::models::session_keys;

/// Products per listing page.
pub const PAGE_SIZE: u32 = 12;

/// How many recently viewed product ids the session keeps.
pub const RECENTLY_VIEWED_CAP: usize = 10;

/// Raw listing query string. Every field arrives as text so that bad input
/// degrades to a warning instead of a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

/// A listing page plus any ignored-parameter warnings.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    #[serde(flatten)]
    pub page: ProductPage,
    pub warnings: Vec<String>,
}

/// Outcome of parsing a [`ListingQuery`].
#[derive(Debug, Clone)]
pub struct ParsedListing {
    pub filter: ProductFilter,
    pub warnings: Vec<String>,
    /// The category parameter could not be a slug, so nothing can match.
    pub unknown_category: bool,
}

fn parse_price_param(name: &str, raw: Option<&str>, warnings: &mut Vec<String>) -> Option<Price> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Price::parse(raw) {
        Ok(price) => Some(price),
        Err(e) => {
            warnings.push(format!("ignored {name} {raw:?}: {e}"));
            None
        }
    }
}

/// Turn the raw query into a storefront filter. Listings only ever show
/// in-stock products.
#[must_use]
pub fn parse_listing(query: &ListingQuery) -> ParsedListing {
    let mut warnings = Vec::new();

    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let mut unknown_category = false;
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match Slug::parse(raw) {
            Ok(slug) => Some(slug),
            Err(_) => {
                unknown_category = true;
                warnings.push(format!("unknown category {raw:?}"));
                None
            }
        },
    };

    let min_price = parse_price_param("min_price", query.min_price.as_deref(), &mut warnings);
    let max_price = parse_price_param("max_price", query.max_price.as_deref(), &mut warnings);

    ParsedListing {
        filter: ProductFilter {
            query: text,
            category,
            min_price,
            max_price,
            sort: ProductSort::from_param(query.sort.as_deref()),
            in_stock_only: true,
        },
        warnings,
        unknown_category,
    }
}

/// Number of pages for `total_count` items. An empty listing still has one page.
#[must_use]
pub fn total_pages(total_count: i64, page_size: u32) -> u32 {
    let size = i64::from(page_size.max(1));
    let pages = (total_count.max(0) + size - 1) / size;
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Resolve the requested page: non-numeric input gives page 1, a number
/// outside `1..=total_pages` gives the last page.
#[must_use]
pub fn resolve_page(requested: Option<&str>, total_pages: u32) -> u32 {
    let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return 1;
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 && n <= i64::from(total_pages) => u32::try_from(n).unwrap_or(1),
        Ok(_) => total_pages,
        Err(_) => 1,
    }
}

/// One page of products matching `filter`, `page_size` per page.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn fetch_page(
    pool: &PgPool,
    filter: &ProductFilter,
    requested_page: Option<&str>,
    page_size: u32,
) -> Result<ProductPage, RepositoryError> {
    let repo = ProductRepository::new(pool);
    let total_count = repo.count(filter).await?;
    let total_pages = total_pages(total_count, page_size);
    let page = resolve_page(requested_page, total_pages);
    let offset = u64::from(page - 1) * u64::from(page_size);

    let products = repo.search(filter, page_size, offset).await?;

    Ok(ProductPage {
        products,
        page,
        total_pages,
        total_count,
    })
}

/// A page with nothing on it.
#[must_use]
pub const fn empty_page() -> ProductPage {
    ProductPage {
        products: Vec::new(),
        page: 1,
        total_pages: 1,
        total_count: 0,
    }
}

/// Run a storefront listing query.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn list_products(pool: &PgPool, query: &ListingQuery) -> Result<Listing, RepositoryError> {
    let parsed = parse_listing(query);

    let page = if parsed.unknown_category {
        empty_page()
    } else {
        fetch_page(pool, &parsed.filter, query.page.as_deref(), PAGE_SIZE).await?
    };

    Ok(Listing {
        page,
        warnings: parsed.warnings,
    })
}

/// Move `id` to the front of `recent`, dropping duplicates and the overflow.
pub fn push_recent(recent: &mut Vec<ProductId>, id: ProductId, cap: usize) {
    recent.retain(|&existing| existing != id);
    recent.insert(0, id);
    recent.truncate(cap);
}

/// Recently viewed product ids, most recent first.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn recently_viewed(
    session: &Session,
) -> Result<Vec<ProductId>, tower_sessions::session::Error> {
    Ok(session
        .get::<Vec<ProductId>>(session_keys::RECENTLY_VIEWED)
        .await?
        .unwrap_or_default())
}

/// Record a product view in the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn record_view(
    session: &Session,
    id: ProductId,
) -> Result<(), tower_sessions::session::Error> {
    let mut recent = recently_viewed(session).await?;
    push_recent(&mut recent, id, RECENTLY_VIEWED_CAP);
    session.insert(session_keys::RECENTLY_VIEWED, recent).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 12), 1);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(25, 12), 3);
    }

    #[test]
    fn test_resolve_page() {
        assert_eq!(resolve_page(None, 3), 1);
        assert_eq!(resolve_page(Some("2"), 3), 2);
        assert_eq!(resolve_page(Some("abc"), 3), 1);
        assert_eq!(resolve_page(Some("99"), 3), 3);
        assert_eq!(resolve_page(Some("0"), 3), 3);
        assert_eq!(resolve_page(Some("-4"), 3), 3);
    }

    #[test]
    fn test_parse_listing_ignores_bad_prices() {
        let parsed = parse_listing(&ListingQuery {
            min_price: Some("cheap".to_owned()),
            max_price: Some("25.50".to_owned()),
            sort: Some("price_high".to_owned()),
            ..ListingQuery::default()
        });
        assert_eq!(parsed.filter.min_price, None);
        assert_eq!(parsed.filter.max_price, Some(Price::parse("25.50").unwrap()));
        assert_eq!(parsed.filter.sort, ProductSort::PriceHigh);
        assert!(parsed.filter.in_stock_only);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings.first().unwrap().contains("min_price"));
    }

    #[test]
    fn test_parse_listing_blank_values_are_absent() {
        let parsed = parse_listing(&ListingQuery {
            q: Some("   ".to_owned()),
            category: Some(String::new()),
            min_price: Some(String::new()),
            ..ListingQuery::default()
        });
        assert_eq!(parsed.filter.query, None);
        assert!(parsed.filter.category.is_none());
        assert!(!parsed.unknown_category);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_parse_listing_bad_category() {
        let parsed = parse_listing(&ListingQuery {
            category: Some("Not A Slug!".to_owned()),
            ..ListingQuery::default()
        });
        assert!(parsed.unknown_category);
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_push_recent_dedupes_and_caps() {
        let mut recent = Vec::new();
        for id in 1..=12 {
            push_recent(&mut recent, ProductId::new(id), RECENTLY_VIEWED_CAP);
        }
        assert_eq!(recent.len(), RECENTLY_VIEWED_CAP);
        assert_eq!(recent.first(), Some(&ProductId::new(12)));

        push_recent(&mut recent, ProductId::new(5), RECENTLY_VIEWED_CAP);
        assert_eq!(recent.first(), Some(&ProductId::new(5)));
        assert_eq!(recent.iter().filter(|&&id| id == ProductId::new(5)).count(), 1);
        assert_eq!(recent.len(), RECENTLY_VIEWED_CAP);
    }
}
