//! Product management.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{CategoryId, Price, ProductId, Slug};
use bazaar_storefront::db::ProductRepository;
use bazaar_storefront::db::products::ProductInput;
use bazaar_storefront::error::{AppError, Result};
use bazaar_storefront::models::{Product, ProductPage};
use bazaar_storefront::routes::extract::{ApiJson, MultipartForm};
use bazaar_storefront::services::catalog::{self, ListingQuery};
use bazaar_storefront::services::media::MediaKind;

use crate::middleware::{RequireAdmin, RequireStaff};
use crate::routes::required_name;
use crate::state::AdminState;

/// Products per admin listing page.
const ADMIN_PAGE_SIZE: u32 = 25;

/// Create or edit body. `slug` is only read on create.
#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    /// Decimal string, e.g. `"19.99"`.
    pub price: String,
    pub stock: u32,
    #[serde(default)]
    pub featured: bool,
}

impl ProductBody {
    fn input(&self) -> Result<ProductInput> {
        let price =
            Price::parse(&self.price).map_err(|e| AppError::BadRequest(format!("price: {e}")))?;
        Ok(ProductInput {
            category_id: self.category_id,
            name: required_name(&self.name)?,
            description: self.description.trim().to_owned(),
            short_description: self.short_description.trim().to_owned(),
            price,
            stock: self.stock,
            featured: self.featured,
            image: None,
        })
    }
}

/// Every product, including sold-out ones, with the storefront filters.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ProductPage>> {
    let mut parsed = catalog::parse_listing(&query);
    parsed.filter.in_stock_only = false;

    if parsed.unknown_category {
        return Ok(Json(catalog::empty_page()));
    }

    let page = catalog::fetch_page(
        state.pool(),
        &parsed.filter,
        query.page.as_deref(),
        ADMIN_PAGE_SIZE,
    )
    .await?;
    Ok(Json(page))
}

async fn find(state: &AdminState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))
}

/// One product.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    find(&state, id).await.map(Json)
}

/// Create a product.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<ProductBody>,
) -> Result<(StatusCode, Json<Product>)> {
    let input = body.input()?;
    let slug = Slug::explicit_or_derived(body.slug.as_deref(), &input.name)
        .map_err(|e| AppError::BadRequest(format!("slug: {e}")))?;

    let product = ProductRepository::new(state.pool())
        .create(&input, &slug)
        .await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Edit a product. The slug and image are left as they are.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    ApiJson(body): ApiJson<ProductBody>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .update(id, &body.input()?)
        .await?;
    Ok(Json(product))
}

/// Replace the product image (multipart field `image`).
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_image(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let mut form = MultipartForm::read(multipart, "image").await?;
    let data = form
        .take_file()
        .ok_or_else(|| AppError::BadRequest("image is required".to_string()))?;

    let media = state.media();
    let path = media.store_image(MediaKind::Product, &data).await?;

    let previous = match ProductRepository::new(state.pool())
        .set_image(id, &path)
        .await
    {
        Ok(previous) => previous,
        Err(err) => {
            if let Err(e) = media.delete(&path).await {
                tracing::warn!(error = %e, path = %path, "Failed to remove orphaned image");
            }
            return Err(err.into());
        }
    };

    if let Some(old) = previous.filter(|old| *old != path) {
        if let Err(e) = media.delete(&old).await {
            tracing::warn!(error = %e, path = %old, "Failed to remove previous image");
        }
    }

    find(&state, id).await.map(Json)
}

/// Delete a product. Refused with 409 while order lines reference it.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let product = find(&state, id).await?;
    ProductRepository::new(state.pool()).delete(id).await?;

    if let Some(image) = &product.image {
        if let Err(e) = state.media().delete(image).await {
            tracing::warn!(error = %e, path = %image, "Failed to remove product image");
        }
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body(name: &str, price: &str) -> ProductBody {
        ProductBody {
            category_id: CategoryId::new(1),
            name: name.to_owned(),
            slug: None,
            description: String::new(),
            short_description: String::new(),
            price: price.to_owned(),
            stock: 3,
            featured: false,
        }
    }

    #[test]
    fn test_input_parses_price() {
        let input = body(" Mug ", "19.99").input().unwrap();
        assert_eq!(input.name, "Mug");
        assert_eq!(input.price, Price::parse("19.99").unwrap());
        assert!(input.image.is_none());
    }

    #[test]
    fn test_input_rejects_bad_values() {
        assert!(matches!(
            body("Mug", "-1").input(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            body("Mug", "1.999").input(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(body("  ", "1.00").input(), Err(AppError::BadRequest(_))));
    }
}
