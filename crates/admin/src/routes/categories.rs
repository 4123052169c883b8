//! Category management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{CategoryId, Slug};
use bazaar_storefront::db::CategoryRepository;
use bazaar_storefront::db::categories::CategoryInput;
use bazaar_storefront::error::{AppError, Result};
use bazaar_storefront::models::{Category, CategoryWithCount};
use bazaar_storefront::routes::extract::ApiJson;

use crate::middleware::{RequireAdmin, RequireStaff};
use crate::routes::required_name;
use crate::state::AdminState;

/// Create or edit body. `slug` is only read on create; when absent it is
/// derived from the name.
#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl CategoryBody {
    fn input(&self) -> Result<CategoryInput> {
        Ok(CategoryInput {
            name: required_name(&self.name)?,
            description: self.description.trim().to_owned(),
            image: None,
        })
    }
}

/// All categories with their total product counts.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
) -> Result<Json<Vec<CategoryWithCount>>> {
    let categories = CategoryRepository::new(state.pool())
        .list_with_counts(false, None)
        .await?;
    Ok(Json(categories))
}

/// One category.
#[instrument(skip(state, _staff))]
pub async fn show(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Category not found: {id}")))
}

/// Create a category.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CategoryBody>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = body.input()?;
    let slug = Slug::explicit_or_derived(body.slug.as_deref(), &input.name)
        .map_err(|e| AppError::BadRequest(format!("slug: {e}")))?;

    let category = CategoryRepository::new(state.pool())
        .create(&input, &slug)
        .await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Edit a category. The slug never changes.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    ApiJson(body): ApiJson<CategoryBody>,
) -> Result<Json<Category>> {
    let category = CategoryRepository::new(state.pool())
        .update(id, &body.input()?)
        .await?;
    Ok(Json(category))
}

/// Delete a category and its products. Refused while any of its products
/// has order history.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AdminState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
