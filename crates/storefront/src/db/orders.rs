//! Order ledger repository.
//!
//! Orders are only created by checkout (see [`crate::services::checkout`]),
//! which drives the transactional helpers at the bottom of this module. After
//! creation the only permitted mutation is a status transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bazaar_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

use super::{RepositoryError, non_negative};
use crate::models::order::{Order, OrderItem, OrderWithItems};

const ORDER_COLUMNS: &str = "id, user_id, total_price, status, shipping_address, phone, notes, \
     created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_price: Decimal,
    status: OrderStatus,
    shipping_address: String,
    phone: String,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            total_price: row.total_price,
            status: row.status,
            shipping_address: row.shipping_address,
            phone: row.phone,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    product_id: ProductId,
    product_name: String,
    product_slug: String,
    quantity: i32,
    price_at_purchase: Price,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_slug: row.product_slug,
            quantity: non_negative(row.quantity, "order item quantity")?,
            price_at_purchase: row.price_at_purchase,
        })
    }
}

/// A product row held under `FOR UPDATE` during checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
}

/// Shipping details captured with an order.
#[derive(Debug, Clone, Default)]
pub struct ShippingDetails {
    pub shipping_address: String,
    pub phone: String,
    pub notes: String,
}

/// Repository for `shop.order` and `shop.order_item`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.order
            WHERE ($1::shop.order_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .bind(super::limit(limit))
            .bind(i64::from(offset))
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// An order with its items, only if `owner` placed it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        owner: UserId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(self.pool)
            .await?;
        self.with_items(row).await
    }

    /// Any order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        self.with_items(row).await
    }

    async fn with_items(
        &self,
        row: Option<OrderRow>,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.items(row.id).await?;
        Ok(Some(OrderWithItems {
            order: row.into(),
            items,
        }))
    }

    /// Lines of an order in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT i.id, i.product_id, p.name AS product_name, p.slug AS product_slug,
                   i.quantity, i.price_at_purchase
            FROM shop.order_item i
            JOIN shop.product p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect()
    }

    /// Move an order to `next` if the status machine allows it.
    ///
    /// When `owner` is set the order must belong to that user; a foreign order
    /// is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no matching order exists.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn transition(
        &self,
        id: OrderId,
        owner: Option<UserId>,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(OrderStatus,)> = sqlx::query_as(
            r"
            SELECT status FROM shop.order
            WHERE id = $1 AND ($2::int4 IS NULL OR user_id = $2)
            FOR UPDATE
            ",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        let (current,) = current.ok_or(RepositoryError::NotFound)?;
        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "order is {current} and cannot become {next}"
            )));
        }

        let sql = format!(
            "UPDATE shop.order SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete an order and its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.order WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Whether the user has bought the product in an order that was not cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_purchased(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM shop.order_item i
                JOIN shop.order o ON o.id = i.order_id
                WHERE o.user_id = $1 AND i.product_id = $2 AND o.status <> 'cancelled'
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}

// =============================================================================
// Checkout transaction helpers
// =============================================================================

/// Lock the product rows for `ids` in id order.
///
/// Locking in a fixed order keeps two checkouts over overlapping products from
/// deadlocking. Ids with no row are absent from the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<LockedProduct>, RepositoryError> {
    let rows = sqlx::query_as::<_, LockedProduct>(
        r"
        SELECT id, name, price, stock
        FROM shop.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Subtract `quantity` from a locked product's stock.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the decrement would go negative,
/// which the caller's stock check should already have ruled out.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE shop.product
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock for product {product_id}"
        )));
    }
    Ok(())
}

/// Insert a pending order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    total_price: Decimal,
    shipping: &ShippingDetails,
) -> Result<Order, RepositoryError> {
    let sql = format!(
        r"
        INSERT INTO shop.order (user_id, total_price, status, shipping_address, phone, notes)
        VALUES ($1, $2, 'pending', $3, $4, $5)
        RETURNING {ORDER_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(user_id)
        .bind(total_price)
        .bind(&shipping.shipping_address)
        .bind(&shipping.phone)
        .bind(&shipping.notes)
        .fetch_one(conn)
        .await?;
    Ok(row.into())
}

/// Insert one order line with its price snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price_at_purchase: Price,
) -> Result<OrderItemId, RepositoryError> {
    let (id,): (OrderItemId,) = sqlx::query_as(
        r"
        INSERT INTO shop.order_item (order_id, product_id, quantity, price_at_purchase)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price_at_purchase)
    .fetch_one(conn)
    .await?;
    Ok(id)
}
