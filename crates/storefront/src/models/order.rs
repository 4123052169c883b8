//! Order ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub phone: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order. `price_at_purchase` never changes after checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub quantity: u32,
    pub price_at_purchase: Price,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price_at_purchase.line_total(self.quantity)
    }
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
