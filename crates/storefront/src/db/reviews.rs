//! Product review repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::engagement::{Review, ReviewStats};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    email: String,
    rating: Rating,
    title: String,
    comment: String,
    image: Option<String>,
    verified_purchase: bool,
    helpful_count: i32,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        let full = format!("{} {}", row.first_name.trim(), row.last_name.trim());
        let author = match full.trim() {
            "" => row.email,
            name => name.to_owned(),
        };
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            author,
            rating: row.rating,
            title: row.title,
            comment: row.comment,
            image: row.image,
            verified_purchase: row.verified_purchase,
            helpful_count: row.helpful_count,
            created_at: row.created_at,
        }
    }
}

/// Fields of a new review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub image: Option<String>,
}

/// Repository for `shop.product_review`.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.product_id, r.user_id, u.first_name, u.last_name, u.email,
                   r.rating, r.title, r.comment, r.image, r.verified_purchase,
                   r.helpful_count, r.created_at
            FROM shop.product_review r
            JOIN shop.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2
            ",
        )
        .bind(product_id)
        .bind(super::limit(limit))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Average rating (one decimal place) and review count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, product_id: ProductId) -> Result<ReviewStats, RepositoryError> {
        let (average, count): (Option<Decimal>, i64) = sqlx::query_as(
            r"
            SELECT ROUND(AVG(rating)::numeric, 1), COUNT(*)
            FROM shop.product_review
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(ReviewStats { average, count })
    }

    /// Whether the user already reviewed the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM shop.product_review WHERE product_id = $1 AND user_id = $2)",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a review from a verified purchaser.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        review: &NewReview,
    ) -> Result<ReviewId, RepositoryError> {
        let (id,): (ReviewId,) = sqlx::query_as(
            r"
            INSERT INTO shop.product_review
                (product_id, user_id, rating, title, comment, image, verified_purchase)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.comment)
        .bind(&review.image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "review"))?;
        Ok(id)
    }
}
