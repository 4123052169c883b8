//! Home page route handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::Result;
use crate::models::catalog::{CategoryWithCount, Product, ProductFilter};
use crate::services::catalog;
use crate::state::AppState;

const FEATURED_COUNT: u32 = 6;
const CATEGORY_COUNT: u32 = 6;
const RECENT_COUNT: usize = 4;

/// Home page payload.
#[derive(Debug, Serialize)]
pub struct HomePage {
    pub featured: Vec<Product>,
    pub categories: Vec<CategoryWithCount>,
    pub recently_viewed: Vec<Product>,
    /// Products that can be bought right now.
    pub total_products: i64,
    pub total_categories: i64,
}

/// Put in-stock `products` in the order of `ids`, skipping ids with no
/// product and products that are sold out.
fn in_stock_in_id_order(ids: &[ProductId], mut products: Vec<Product>) -> Vec<Product> {
    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(pos) = products.iter().position(|p| p.id == *id && p.in_stock()) {
            ordered.push(products.swap_remove(pos));
        }
    }
    ordered
}

/// Featured products (or the newest when none are featured), categories and
/// the visitor's recently viewed products.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<Json<HomePage>> {
    let products = ProductRepository::new(state.pool());

    let mut featured = products.featured(FEATURED_COUNT).await?;
    if featured.is_empty() {
        featured = products.newest(FEATURED_COUNT).await?;
    }

    let category_repo = CategoryRepository::new(state.pool());
    let categories = category_repo
        .list_with_counts(true, Some(CATEGORY_COUNT))
        .await?;
    let total_categories = category_repo.count().await?;
    let total_products = products
        .count(&ProductFilter {
            in_stock_only: true,
            ..ProductFilter::default()
        })
        .await?;

    let mut recent_ids = catalog::recently_viewed(&session).await?;
    recent_ids.truncate(RECENT_COUNT);
    let recently_viewed =
        in_stock_in_id_order(&recent_ids, products.get_many(&recent_ids).await?);

    Ok(Json(HomePage {
        featured,
        categories,
        recently_viewed,
        total_products,
        total_categories,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use bazaar_core::{CategoryId, Price, Slug};

    fn product(id: i32, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: CategoryId::new(1),
            name: format!("Product {id}"),
            slug: Slug::parse(&format!("product-{id}")).unwrap(),
            description: String::new(),
            short_description: String::new(),
            price: Price::parse("4.00").unwrap(),
            stock,
            featured: false,
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recently_viewed_keeps_view_order_and_skips_sold_out() {
        let ids = [3, 1, 2, 9].map(ProductId::new);
        let found = vec![product(1, 5), product(2, 0), product(3, 1)];

        let shown: Vec<i32> = in_stock_in_id_order(&ids, found)
            .iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(shown, vec![3, 1]);
    }
}
