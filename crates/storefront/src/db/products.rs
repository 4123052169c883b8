//! Product repository.
//!
//! Listing queries bind every optional filter as a nullable parameter so the
//! statement text stays static apart from the `ORDER BY` clause, which comes
//! from a fixed set in [`ProductSort`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{CategoryId, Price, ProductId, Slug};

use super::{RepositoryError, non_negative};
use crate::models::catalog::{Product, ProductFilter, ProductSort};

const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.slug, p.description, \
     p.short_description, p.price, p.stock, p.featured, p.image, p.created_at, p.updated_at";

const LISTING_WHERE: &str = r"
    WHERE ($1::text IS NULL
           OR p.name ILIKE $1 OR p.description ILIKE $1 OR p.short_description ILIKE $1)
      AND ($2::text IS NULL OR c.slug = $2)
      AND ($3::numeric IS NULL OR p.price >= $3)
      AND ($4::numeric IS NULL OR p.price <= $4)
      AND (NOT $5 OR p.stock > 0)
";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    name: String,
    slug: String,
    description: String,
    short_description: String,
    price: Price,
    stock: i32,
    featured: bool,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product slug {:?}: {e}", row.slug))
        })?;
        Ok(Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            slug,
            description: row.description,
            short_description: row.short_description,
            price: row.price,
            stock: non_negative(row.stock, "stock")?,
            featured: row.featured,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Input for creating or editing a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub price: Price,
    pub stock: u32,
    pub featured: bool,
    pub image: Option<String>,
}

impl ProductInput {
    fn stock_i32(&self) -> Result<i32, RepositoryError> {
        i32::try_from(self.stock)
            .map_err(|_| RepositoryError::Conflict("stock is out of range".to_owned()))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for `shop.product`.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count products matching a filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let sql = format!(
            "SELECT COUNT(*) FROM shop.product p JOIN shop.category c ON c.id = p.category_id {LISTING_WHERE}"
        );
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.query.as_deref().map(like_pattern))
            .bind(filter.category.as_ref().map(Slug::as_str))
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.in_stock_only)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// One page of products matching a filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        filter: &ProductFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}, r.avg_rating
            FROM shop.product p
            JOIN shop.category c ON c.id = p.category_id
            LEFT JOIN LATERAL (
                SELECT AVG(rating) AS avg_rating
                FROM shop.product_review
                WHERE product_id = p.id
            ) r ON TRUE
            {LISTING_WHERE}
            ORDER BY {order}
            LIMIT $6 OFFSET $7
            ",
            order = filter.sort.order_by(),
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.query.as_deref().map(like_pattern))
            .bind(filter.category.as_ref().map(Slug::as_str))
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.in_stock_only)
            .bind(super::limit(limit))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(self.pool)
            .await?;
        into_products(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.slug = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    /// Fetch several products at once. Missing ids are simply absent from the
    /// result; order follows the database, not `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.id = ANY($1)");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        into_products(rows)
    }

    /// Featured products with stock, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM shop.product p
            WHERE p.featured AND p.stock > 0
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1
            "
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(super::limit(limit))
            .fetch_all(self.pool)
            .await?;
        into_products(rows)
    }

    /// Newest products with stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let filter = ProductFilter {
            sort: ProductSort::Newest,
            in_stock_only: true,
            ..ProductFilter::default()
        };
        self.search(&filter, limit, 0).await
    }

    /// Other in-stock products from the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(
        &self,
        product: &Product,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM shop.product p
            WHERE p.category_id = $1 AND p.id <> $2 AND p.stock > 0
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $3
            "
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product.category_id)
            .bind(product.id)
            .bind(super::limit(limit))
            .fetch_all(self.pool)
            .await?;
        into_products(rows)
    }

    /// Insert a product. The slug is fixed from here on.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Protected` if the category does not exist.
    pub async fn create(&self, input: &ProductInput, slug: &Slug) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO shop.product AS p
                (category_id, name, slug, description, short_description, price, stock, featured, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(input.category_id)
            .bind(input.name.trim())
            .bind(slug.as_str())
            .bind(&input.description)
            .bind(&input.short_description)
            .bind(input.price)
            .bind(input.stock_i32()?)
            .bind(input.featured)
            .bind(&input.image)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "product slug"))?
            .try_into()
    }

    /// Edit a product. The slug is not updatable. A `None` image keeps the
    /// current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.product AS p
            SET category_id = $2, name = $3, description = $4, short_description = $5,
                price = $6, stock = $7, featured = $8, image = COALESCE($9, p.image),
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(input.category_id)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(&input.short_description)
            .bind(input.price)
            .bind(input.stock_i32()?)
            .bind(input.featured)
            .bind(&input.image)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "product"))?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }

    /// Change only the price. Existing order lines keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_price(&self, id: ProductId, price: Price) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.product SET price = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(price)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Point the product at a new image. Returns the previous image path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_image(
        &self,
        id: ProductId,
        image: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (previous,): (Option<String>,) =
            sqlx::query_as("SELECT image FROM shop.product WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE shop.product SET image = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(image)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(previous)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` if any order line references it;
    /// the product and its history are left untouched.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "product"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("mug"), "%mug%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn test_every_sort_ends_on_unique_key() {
        for sort in [
            ProductSort::PriceLow,
            ProductSort::PriceHigh,
            ProductSort::Name,
            ProductSort::Newest,
            ProductSort::Rating,
        ] {
            assert!(sort.order_by().contains("p.id"), "{sort:?}");
        }
    }
}
