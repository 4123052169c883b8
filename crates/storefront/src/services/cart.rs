//! Session cart with write-through persistence for signed-in users.
//!
//! The cart lives in the session under [`session_keys::CART`]. While a user is
//! signed in every change is also written to `shop.cart_item`, so the cart
//! survives logout and is merged back in at the next login.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Cart, CartError, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::catalog::Product;
use crate::models::session_keys;

/// Errors from loading or saving the session cart.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Why an add or update request was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartChangeError {
    #[error("Only {stock} available in stock.")]
    InsufficientStock { stock: u32 },

    #[error(transparent)]
    Invalid(#[from] CartError),
}

/// One priced cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// The cart priced at current catalog prices.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub total: Decimal,
}

/// Add `requested` units (at least 1) of `product`, clamped to unclaimed stock.
///
/// Returns the number of units actually added.
///
/// # Errors
///
/// Returns `CartChangeError::InsufficientStock` if no unit can be added.
pub fn add_to_cart(
    cart: &mut Cart,
    product: &Product,
    requested: u32,
) -> Result<u32, CartChangeError> {
    let quantity = cart.addable_quantity(product.id, product.stock, requested);
    if quantity == 0 {
        return Err(CartChangeError::InsufficientStock {
            stock: product.stock,
        });
    }
    cart.add(product.id, quantity)?;
    Ok(quantity)
}

/// Set the quantity of `product`; zero removes the line.
///
/// # Errors
///
/// Returns `CartChangeError::InsufficientStock` if `quantity` exceeds stock.
pub fn update_in_cart(
    cart: &mut Cart,
    product: &Product,
    quantity: u32,
) -> Result<(), CartChangeError> {
    if quantity > product.stock {
        return Err(CartChangeError::InsufficientStock {
            stock: product.stock,
        });
    }
    cart.update(product.id, quantity)?;
    Ok(())
}

/// Price a cart against `products`, dropping lines whose product is gone.
///
/// Lines come out in product id order.
#[must_use]
pub fn summarize(cart: &mut Cart, products: Vec<Product>) -> CartSummary {
    let mut by_id: HashMap<ProductId, Product> = products.into_iter().map(|p| (p.id, p)).collect();
    cart.retain(|id| by_id.contains_key(&id));

    let total = cart.total(|id| by_id.get(&id).map(|p| p.price));
    let item_count = cart.item_count();
    let lines = cart
        .lines()
        .filter_map(|line| {
            let product = by_id.remove(&line.product_id)?;
            Some(CartLineView {
                line_total: product.price.line_total(line.quantity),
                quantity: line.quantity,
                product,
            })
        })
        .collect();

    CartSummary {
        lines,
        item_count,
        total,
    }
}

/// Session-bound cart access.
pub struct CartStore<'a> {
    pool: &'a PgPool,
    session: &'a Session,
}

impl<'a> CartStore<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, session: &'a Session) -> Self {
        Self { pool, session }
    }

    /// The session cart, empty if none was stored.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError::Session` if the session store fails.
    pub async fn load(&self) -> Result<Cart, CartStoreError> {
        Ok(self
            .session
            .get::<Cart>(session_keys::CART)
            .await?
            .unwrap_or_default())
    }

    /// Store the cart in the session and, for a signed-in user, in the database.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if either store fails.
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn save(&self, user: Option<UserId>, cart: &Cart) -> Result<(), CartStoreError> {
        self.session.insert(session_keys::CART, cart).await?;
        if let Some(user_id) = user {
            CartRepository::new(self.pool).replace(user_id, cart).await?;
        }
        Ok(())
    }

    /// Load the cart and price it at current prices.
    ///
    /// Lines for deleted products are dropped and the pruned cart is saved back.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if a store or the product lookup fails.
    pub async fn summary(&self, user: Option<UserId>) -> Result<CartSummary, CartStoreError> {
        let mut cart = self.load().await?;
        let ids: Vec<ProductId> = cart.product_ids().collect();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;

        let before = cart.len();
        let summary = summarize(&mut cart, products);
        if cart.len() != before {
            self.save(user, &cart).await?;
        }
        Ok(summary)
    }

    /// Merge the anonymous session cart into the user's persisted cart and
    /// make the result the session cart.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if either store fails.
    #[instrument(skip(self))]
    pub async fn merge_on_login(&self, user_id: UserId) -> Result<Cart, CartStoreError> {
        let repo = CartRepository::new(self.pool);
        let mut merged = repo.load(user_id).await?;
        merged.merge(&self.load().await?);
        repo.replace(user_id, &merged).await?;
        self.session.insert(session_keys::CART, &merged).await?;
        Ok(merged)
    }

    /// Empty both the session cart and the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError` if either store fails.
    pub async fn clear(&self, user: Option<UserId>) -> Result<(), CartStoreError> {
        self.session.remove::<Cart>(session_keys::CART).await?;
        if let Some(user_id) = user {
            CartRepository::new(self.pool).clear(user_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use bazaar_core::{CategoryId, Price, Slug};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: i32, price: &str, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: CategoryId::new(1),
            name: format!("Product {id}"),
            slug: Slug::parse(&format!("product-{id}")).unwrap(),
            description: String::new(),
            short_description: String::new(),
            price: Price::parse(price).unwrap(),
            stock,
            featured: false,
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_defaults_to_one() {
        let mut cart = Cart::new();
        let p = product(1, "5.00", 3);
        assert_eq!(add_to_cart(&mut cart, &p, 0).unwrap(), 1);
        assert_eq!(cart.quantity_of(p.id), 1);
    }

    #[test]
    fn test_add_clamps_to_unclaimed_stock() {
        let mut cart = Cart::new();
        let p = product(1, "5.00", 3);
        cart.add(p.id, 2).unwrap();
        assert_eq!(add_to_cart(&mut cart, &p, 5).unwrap(), 1);
        assert_eq!(cart.quantity_of(p.id), 3);
        assert_eq!(
            add_to_cart(&mut cart, &p, 1),
            Err(CartChangeError::InsufficientStock { stock: 3 })
        );
        assert_eq!(cart.quantity_of(p.id), 3);
    }

    #[test]
    fn test_add_out_of_stock_message() {
        let mut cart = Cart::new();
        let err = add_to_cart(&mut cart, &product(1, "5.00", 0), 1).unwrap_err();
        assert_eq!(err.to_string(), "Only 0 available in stock.");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_rejects_more_than_stock() {
        let mut cart = Cart::new();
        let p = product(1, "5.00", 2);
        cart.add(p.id, 1).unwrap();
        assert!(update_in_cart(&mut cart, &p, 3).is_err());
        assert_eq!(cart.quantity_of(p.id), 1);
        update_in_cart(&mut cart, &p, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_summarize_drops_missing_and_uses_live_prices() {
        let mut cart = Cart::new();
        cart.add(ProductId::new(1), 2).unwrap();
        cart.add(ProductId::new(2), 1).unwrap();

        let summary = summarize(&mut cart, vec![product(1, "19.99", 5)]);

        assert_eq!(cart.len(), 1);
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total, dec("39.98"));
        assert_eq!(summary.lines.first().unwrap().line_total, dec("39.98"));
    }
}
