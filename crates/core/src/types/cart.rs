//! Shopping cart arithmetic.
//!
//! A [`Cart`] is a mapping from product to requested quantity. It holds no
//! prices: totals are always computed against the live catalog, so a price
//! change is reflected in every open cart until checkout snapshots it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity may not exceed {max}")]
    TooMany { max: u32 },
}

/// One product line of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Product → quantity mapping. Every stored quantity is at least 1.
///
/// Serialized as a list of [`CartLine`]s so it can be stored in a session
/// without integer map keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: BTreeMap<ProductId, u32>,
}

impl Cart {
    /// Largest quantity a single line may hold (fits a Postgres `INTEGER`).
    pub const MAX_LINE_QUANTITY: u32 = 10_000;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.values().map(|&q| u64::from(q)).sum()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines.get(&product_id).copied().unwrap_or(0)
    }

    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.lines.keys().copied()
    }

    pub fn lines(&self) -> impl Iterator<Item = CartLine> + '_ {
        self.lines.iter().map(|(&product_id, &quantity)| CartLine {
            product_id,
            quantity,
        })
    }

    /// Increase the quantity of `product_id` by `quantity`, inserting the line
    /// if needed. Returns the new line quantity.
    ///
    /// # Errors
    ///
    /// Fails if `quantity` is zero or the line would exceed
    /// [`Cart::MAX_LINE_QUANTITY`]; the cart is unchanged on error.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let next = self
            .quantity_of(product_id)
            .checked_add(quantity)
            .filter(|&q| q <= Self::MAX_LINE_QUANTITY)
            .ok_or(CartError::TooMany {
                max: Self::MAX_LINE_QUANTITY,
            })?;
        self.lines.insert(product_id, next);
        Ok(next)
    }

    /// Set the quantity of a line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Fails if `quantity` exceeds [`Cart::MAX_LINE_QUANTITY`].
    pub fn update(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity > Self::MAX_LINE_QUANTITY {
            return Err(CartError::TooMany {
                max: Self::MAX_LINE_QUANTITY,
            });
        }
        if quantity == 0 {
            self.lines.remove(&product_id);
        } else {
            self.lines.insert(product_id, quantity);
        }
        Ok(())
    }

    /// Remove a line. Returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.lines.remove(&product_id).is_some()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Drop lines whose product fails the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(ProductId) -> bool) {
        self.lines.retain(|&id, _| keep(id));
    }

    /// Union `other` into this cart, summing quantities for shared products.
    ///
    /// Sums are capped at [`Cart::MAX_LINE_QUANTITY`] rather than failing so a
    /// login never loses an anonymous cart.
    pub fn merge(&mut self, other: &Self) {
        for line in other.lines() {
            let merged = self
                .quantity_of(line.product_id)
                .saturating_add(line.quantity)
                .min(Self::MAX_LINE_QUANTITY);
            self.lines.insert(line.product_id, merged);
        }
    }

    /// Total at current prices. Lines with no known price contribute nothing.
    #[must_use]
    pub fn total(&self, price_of: impl Fn(ProductId) -> Option<Price>) -> Decimal {
        self.lines()
            .filter_map(|line| price_of(line.product_id).map(|p| p.line_total(line.quantity)))
            .sum()
    }

    /// How many units an add request may actually put in the cart.
    ///
    /// The request is clamped to at least 1 and to the stock not already
    /// claimed by this cart. Zero means nothing can be added.
    #[must_use]
    pub fn addable_quantity(&self, product_id: ProductId, stock: u32, requested: u32) -> u32 {
        let available = stock.saturating_sub(self.quantity_of(product_id));
        requested.max(1).min(available)
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines.into_iter().filter(|l| l.quantity > 0) {
            let merged = cart
                .quantity_of(line.product_id)
                .saturating_add(line.quantity)
                .min(Self::MAX_LINE_QUANTITY);
            cart.lines.insert(line.product_id, merged);
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn pid(n: i32) -> ProductId {
        ProductId::new(n)
    }

    #[test]
    fn test_add_inserts_then_increments() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(pid(1), 2).unwrap(), 2);
        assert_eq!(cart.add(pid(1), 3).unwrap(), 5);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_rejects_zero_and_overflow() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(pid(1), 0), Err(CartError::ZeroQuantity));
        cart.add(pid(1), Cart::MAX_LINE_QUANTITY).unwrap();
        assert!(cart.add(pid(1), 1).is_err());
        assert_eq!(cart.quantity_of(pid(1)), Cart::MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(pid(1), 2).unwrap();
        cart.update(pid(1), 7).unwrap();
        assert_eq!(cart.quantity_of(pid(1)), 7);
        cart.update(pid(1), 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(pid(4), 1).unwrap();
        assert!(cart.remove(pid(4)));
        assert!(!cart.remove(pid(4)));
    }

    #[test]
    fn test_merge_sums_quantities() {
        let mut persisted = Cart::new();
        persisted.add(pid(1), 1).unwrap();
        persisted.add(pid(2), 4).unwrap();

        let mut anonymous = Cart::new();
        anonymous.add(pid(2), 3).unwrap();
        anonymous.add(pid(3), 1).unwrap();

        persisted.merge(&anonymous);
        assert_eq!(persisted.quantity_of(pid(1)), 1);
        assert_eq!(persisted.quantity_of(pid(2)), 7);
        assert_eq!(persisted.quantity_of(pid(3)), 1);
    }

    #[test]
    fn test_total_uses_supplied_prices_and_skips_unknown() {
        let mut cart = Cart::new();
        cart.add(pid(1), 2).unwrap();
        cart.add(pid(2), 1).unwrap();
        cart.add(pid(3), 5).unwrap();

        let prices: HashMap<ProductId, Price> = [
            (pid(1), Price::parse("19.99").unwrap()),
            (pid(2), Price::parse("0.02").unwrap()),
        ]
        .into();

        let total = cart.total(|id| prices.get(&id).copied());
        assert_eq!(total, Decimal::from_str("40.00").unwrap());
    }

    #[test]
    fn test_addable_quantity_respects_stock_already_in_cart() {
        let mut cart = Cart::new();
        assert_eq!(cart.addable_quantity(pid(1), 5, 0), 1);
        assert_eq!(cart.addable_quantity(pid(1), 5, 9), 5);

        cart.add(pid(1), 4).unwrap();
        assert_eq!(cart.addable_quantity(pid(1), 5, 3), 1);

        cart.add(pid(1), 1).unwrap();
        assert_eq!(cart.addable_quantity(pid(1), 5, 1), 0);
        assert_eq!(cart.addable_quantity(pid(1), 0, 1), 0);
    }

    #[test]
    fn test_session_encoding_is_a_line_list() {
        let mut cart = Cart::new();
        cart.add(pid(2), 1).unwrap();
        cart.add(pid(1), 3).unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"product_id": 1, "quantity": 3},
                {"product_id": 2, "quantity": 1}
            ])
        );
    }

    #[test]
    fn test_decoding_drops_zero_lines_and_folds_duplicates() {
        let cart: Cart = serde_json::from_str(
            r#"[{"product_id":1,"quantity":0},{"product_id":2,"quantity":2},{"product_id":2,"quantity":1}]"#,
        )
        .unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(pid(2)), 3);
    }
}
