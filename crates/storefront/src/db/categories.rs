//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{CategoryId, Slug};

use super::RepositoryError;
use crate::models::catalog::{Category, CategoryWithCount};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category slug {:?}: {e}", row.slug))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            slug,
            description: row.description,
            image: row.image,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryCountRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    product_count: i64,
}

/// Input for creating or editing a category.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
}

/// Repository for `shop.category`.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by name with their product counts.
    ///
    /// `in_stock_only` restricts the count to purchasable products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_counts(
        &self,
        in_stock_only: bool,
        limit: Option<u32>,
    ) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r"
            SELECT c.id, c.name, c.slug, c.description, c.image, c.created_at,
                   COUNT(p.id) AS product_count
            FROM shop.category c
            LEFT JOIN shop.product p
                   ON p.category_id = c.id AND (NOT $1 OR p.stock > 0)
            GROUP BY c.id
            ORDER BY c.name ASC
            LIMIT $2
            ",
        )
        .bind(in_stock_only)
        .bind(limit.map(super::limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryWithCount {
                    category: row.category.try_into()?,
                    product_count: row.product_count,
                })
            })
            .collect()
    }

    /// Number of categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.category")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, image, created_at FROM shop.category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Category::try_from)
        .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description, image, created_at FROM shop.category WHERE slug = $1",
        )
        .bind(slug.as_str())
        .fetch_optional(self.pool)
        .await?
        .map(Category::try_from)
        .transpose()
    }

    /// Insert a category. The slug is fixed from here on.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn create(
        &self,
        input: &CategoryInput,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO shop.category (name, slug, description, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, description, image, created_at
            ",
        )
        .bind(input.name.trim())
        .bind(slug.as_str())
        .bind(&input.description)
        .bind(&input.image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category name or slug"))?
        .try_into()
    }

    /// Edit a category. The slug is deliberately not updatable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE shop.category
            SET name = $2, description = $3, image = COALESCE($4, image)
            WHERE id = $1
            RETURNING id, name, slug, description, image, created_at
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.image)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category name"))?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// Delete a category and, by cascade, its products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Protected` if any of its products has order history.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "category"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
