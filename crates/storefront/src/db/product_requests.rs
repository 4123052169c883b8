//! Customer product request repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{Price, ProductRequestId, UserId};

use super::RepositoryError;
use crate::models::engagement::ProductRequest;

#[derive(Debug, sqlx::FromRow)]
struct ProductRequestRow {
    id: ProductRequestId,
    user_id: Option<UserId>,
    product_name: String,
    details: String,
    desired_price: Option<Price>,
    reference_image: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRequestRow> for ProductRequest {
    fn from(row: ProductRequestRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_name: row.product_name,
            details: row.details,
            desired_price: row.desired_price,
            reference_image: row.reference_image,
            created_at: row.created_at,
        }
    }
}

/// Fields of a new product request.
#[derive(Debug, Clone)]
pub struct NewProductRequest {
    pub user_id: Option<UserId>,
    pub product_name: String,
    pub details: String,
    pub desired_price: Option<Price>,
    pub reference_image: Option<String>,
}

/// Repository for `shop.product_request`.
pub struct ProductRequestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRequestRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        request: &NewProductRequest,
    ) -> Result<ProductRequest, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRequestRow>(
            r"
            INSERT INTO shop.product_request
                (user_id, product_name, details, desired_price, reference_image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, product_name, details, desired_price, reference_image, created_at
            ",
        )
        .bind(request.user_id)
        .bind(request.product_name.trim())
        .bind(&request.details)
        .bind(request.desired_price)
        .bind(&request.reference_image)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Newest requests first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<ProductRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRequestRow>(
            r"
            SELECT id, user_id, product_name, details, desired_price, reference_image, created_at
            FROM shop.product_request
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(super::limit(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(ProductRequest::from).collect())
    }
}
