//! Persisted carts of signed-in users.
//!
//! The session cart is authoritative while browsing; this table mirrors it for
//! signed-in users so the cart survives logout and merges into the next login.

use sqlx::PgPool;

use bazaar_core::{Cart, CartLine, ProductId, UserId};

use super::{RepositoryError, non_negative};

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    product_id: ProductId,
    quantity: i32,
}

/// Repository for `shop.cart_item`.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT product_id, quantity FROM shop.cart_item WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|row| {
                Ok(CartLine {
                    product_id: row.product_id,
                    quantity: non_negative(row.quantity, "cart quantity")?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        Ok(Cart::from(lines))
    }

    /// Replace a user's persisted cart with `cart`.
    ///
    /// Lines for products that no longer exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn replace(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let (product_ids, quantities): (Vec<ProductId>, Vec<i32>) = cart
            .lines()
            .map(|line| {
                (
                    line.product_id,
                    i32::try_from(line.quantity).unwrap_or(i32::MAX),
                )
            })
            .unzip();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !product_ids.is_empty() {
            sqlx::query(
                r"
                INSERT INTO shop.cart_item (user_id, product_id, quantity)
                SELECT $1, line.product_id, line.quantity
                FROM UNNEST($2::int4[], $3::int4[]) AS line (product_id, quantity)
                JOIN shop.product p ON p.id = line.product_id
                ",
            )
            .bind(user_id)
            .bind(&product_ids)
            .bind(&quantities)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Empty a user's persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
