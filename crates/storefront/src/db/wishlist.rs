//! Wishlist repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::ProductRow;
use crate::models::catalog::Product;
use crate::models::engagement::WishlistEntry;

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    #[sqlx(flatten)]
    product: ProductRow,
    added_at: DateTime<Utc>,
}

/// Repository for `shop.wishlist_item`.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's wishlist, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT p.id, p.category_id, p.name, p.slug, p.description, p.short_description,
                   p.price, p.stock, p.featured, p.image, p.created_at, p.updated_at,
                   w.added_at
            FROM shop.wishlist_item w
            JOIN shop.product p ON p.id = w.product_id
            WHERE w.user_id = $1
            ORDER BY w.added_at DESC, w.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(WishlistEntry {
                    product: Product::try_from(row.product)?,
                    added_at: row.added_at,
                })
            })
            .collect()
    }

    /// Add a product. Returns `false` if it was already on the list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` if the product does not exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO shop.wishlist_item (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "wishlist item"))?;
        Ok(result.rows_affected() == 1)
    }

    /// Remove a product. Returns `false` if it was not on the list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.wishlist_item WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn contains(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM shop.wishlist_item WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}
