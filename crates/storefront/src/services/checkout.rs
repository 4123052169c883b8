//! Checkout: turn a cart into an order without overselling.
//!
//! The whole operation runs in one transaction. Every product in the cart is
//! locked with `SELECT ... FOR UPDATE` in id order, stock is checked against
//! the locked rows, and only when every line fits are stock decremented and
//! the order written. Any shortage rolls back with nothing changed.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{Cart, Price, ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::orders::{self, LockedProduct, ShippingDetails};
use crate::models::order::Order;

/// A cart line that cannot be fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub product_id: ProductId,
    /// Empty when the product no longer exists.
    pub name: String,
    pub requested: u32,
    pub available: u32,
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for {} product(s)", .0.len())]
    InsufficientStock(Vec<StockShortage>),

    #[error("order total exceeds {max}")]
    TotalTooLarge { max: Decimal },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Largest total `shop.order.total_price` (`NUMERIC(12,2)`) can hold.
#[must_use]
pub fn max_order_total() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Reject totals the order ledger cannot store.
///
/// # Errors
///
/// Returns `CheckoutError::TotalTooLarge` above [`max_order_total`].
pub fn check_total(total: Decimal) -> Result<(), CheckoutError> {
    let max = max_order_total();
    if total > max {
        return Err(CheckoutError::TotalTooLarge { max });
    }
    Ok(())
}

/// One line of a validated order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
}

/// A cart checked against locked stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Decimal,
}

/// Check every cart line against the locked product rows.
///
/// A product missing from `locked` counts as zero available.
///
/// # Errors
///
/// Returns every short line when any line cannot be fulfilled.
pub fn plan_order(cart: &Cart, locked: &[LockedProduct]) -> Result<OrderPlan, Vec<StockShortage>> {
    let by_id: HashMap<ProductId, &LockedProduct> = locked.iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(cart.len());
    let mut shortages = Vec::new();

    for line in cart.lines() {
        let product = by_id.get(&line.product_id);
        let available = product.map_or(0, |p| u32::try_from(p.stock).unwrap_or(0));

        match product {
            Some(p) if available >= line.quantity => lines.push(PlannedLine {
                product_id: p.id,
                quantity: line.quantity,
                unit_price: p.price,
            }),
            _ => shortages.push(StockShortage {
                product_id: line.product_id,
                name: product.map(|p| p.name.clone()).unwrap_or_default(),
                requested: line.quantity,
                available,
            }),
        }
    }

    if !shortages.is_empty() {
        return Err(shortages);
    }

    let total = lines
        .iter()
        .map(|l| l.unit_price.line_total(l.quantity))
        .sum();
    Ok(OrderPlan { lines, total })
}

/// Place an order for `cart`.
///
/// Does not touch the caller's cart; clear it only after this returns `Ok`.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart.
/// Returns `CheckoutError::InsufficientStock` listing every short line.
#[instrument(skip(pool, cart, shipping), fields(lines = cart.len()))]
pub async fn place_order(
    pool: &PgPool,
    user_id: UserId,
    cart: &Cart,
    shipping: &ShippingDetails,
) -> Result<Order, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let ids: Vec<ProductId> = cart.product_ids().collect();

    let mut tx = pool.begin().await?;

    let locked = orders::lock_products(&mut *tx, &ids).await?;
    let plan = match plan_order(cart, &locked) {
        Ok(plan) => plan,
        Err(shortages) => {
            tx.rollback().await?;
            tracing::info!(shortages = shortages.len(), "Checkout rejected for insufficient stock");
            return Err(CheckoutError::InsufficientStock(shortages));
        }
    };
    if let Err(e) = check_total(plan.total) {
        tx.rollback().await?;
        return Err(e);
    }

    for line in &plan.lines {
        orders::decrement_stock(&mut *tx, line.product_id, to_db_quantity(line.quantity)).await?;
    }

    let order = orders::insert_order(&mut *tx, user_id, plan.total, shipping).await?;

    for line in &plan.lines {
        orders::insert_item(
            &mut *tx,
            order.id,
            line.product_id,
            to_db_quantity(line.quantity),
            line.unit_price,
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(order_id = %order.id, total = %order.total_price, "Order placed");
    Ok(order)
}

/// Cart quantities are capped at `Cart::MAX_LINE_QUANTITY`, well inside `i32`.
fn to_db_quantity(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}
