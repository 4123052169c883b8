//! Product route handlers.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::Rating;

use crate::db::reviews::NewReview;
use crate::db::{
    CategoryRepository, OrderRepository, ProductRepository, ReviewRepository, WishlistRepository,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::catalog::{Category, Product};
use crate::models::engagement::{Review, ReviewStats};
use crate::routes::extract::MultipartForm;
use crate::services::catalog::{self, Listing, ListingQuery};
use crate::services::media::MediaKind;
use crate::state::AppState;

const RELATED_COUNT: u32 = 4;
const REVIEW_COUNT: u32 = 10;
const MAX_REVIEW_TITLE: usize = 200;

/// Everything the product page shows.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Option<Category>,
    pub related: Vec<Product>,
    pub reviews: Vec<Review>,
    pub review_stats: ReviewStats,
    pub in_wishlist: bool,
    pub can_review: bool,
}

/// Product listing with search, filters, sorting and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Listing>> {
    let listing = catalog::list_products(state.pool(), &query).await?;
    Ok(Json(listing))
}

async fn find_by_slug(state: &AppState, slug: &str) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {slug}")))
}

/// Product detail page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let product = find_by_slug(&state, &slug).await?;
    let pool = state.pool();

    let category = CategoryRepository::new(pool).get(product.category_id).await?;
    let related = ProductRepository::new(pool)
        .related(&product, RELATED_COUNT)
        .await?;

    let reviews_repo = ReviewRepository::new(pool);
    let reviews = reviews_repo
        .list_for_product(product.id, REVIEW_COUNT)
        .await?;
    let review_stats = reviews_repo.stats(product.id).await?;

    let (in_wishlist, can_review) = match &user {
        Some(user) => {
            let in_wishlist = WishlistRepository::new(pool)
                .contains(user.id, product.id)
                .await?;
            let purchased = OrderRepository::new(pool)
                .has_purchased(user.id, product.id)
                .await?;
            let reviewed = reviews_repo.exists(product.id, user.id).await?;
            (in_wishlist, purchased && !reviewed)
        }
        None => (false, false),
    };

    catalog::record_view(&session, product.id).await?;

    Ok(Json(ProductDetail {
        product,
        category,
        related,
        reviews,
        review_stats,
        in_wishlist,
        can_review,
    }))
}

fn parse_review(form: &MultipartForm) -> Result<(Rating, String, String)> {
    let rating = form
        .required("rating")?
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("rating must be a number".to_string()))
        .and_then(|n| Rating::new(n).map_err(|e| AppError::BadRequest(e.to_string())))?;

    let title = form.required("title")?;
    if title.chars().count() > MAX_REVIEW_TITLE {
        return Err(AppError::BadRequest(format!(
            "title must be at most {MAX_REVIEW_TITLE} characters"
        )));
    }
    let comment = form.required("comment")?;

    Ok((rating, title.to_owned(), comment.to_owned()))
}

/// Submit a review (multipart: `rating`, `title`, `comment`, optional `image`).
///
/// Only customers who bought the product may review it, once.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let mut form = MultipartForm::read(multipart, "image").await?;
    let (rating, title, comment) = parse_review(&form)?;

    let product = find_by_slug(&state, &slug).await?;
    let pool = state.pool();

    if !OrderRepository::new(pool)
        .has_purchased(user.id, product.id)
        .await?
    {
        return Err(AppError::Forbidden(
            "You can only review products you have purchased.".to_string(),
        ));
    }

    let reviews = ReviewRepository::new(pool);
    if reviews.exists(product.id, user.id).await? {
        return Err(AppError::Conflict(
            "You have already reviewed this product.".to_string(),
        ));
    }

    let image = match form.take_file() {
        Some(data) => Some(state.media().store_image(MediaKind::Review, &data).await?),
        None => None,
    };

    let review = NewReview {
        rating,
        title,
        comment,
        image,
    };

    let id = match reviews.create(product.id, user.id, &review).await {
        Ok(id) => id,
        Err(err) => {
            if let Some(path) = &review.image {
                if let Err(e) = state.media().delete(path).await {
                    tracing::warn!(error = %e, path = %path, "Failed to remove orphaned review image");
                }
            }
            return Err(err.into());
        }
    };

    add_breadcrumb("review", "Review submitted", Some(&[("product", slug.as_str())]));
    tracing::info!(review_id = %id, product_id = %product.id, "Review created");

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (k, v) in pairs {
            form.insert_field(k, v);
        }
        form
    }

    #[test]
    fn test_parse_review_valid() {
        let (rating, title, comment) =
            parse_review(&form(&[("rating", "5"), ("title", " Great "), ("comment", "Love it")]))
                .unwrap();
        assert_eq!(rating.get(), 5);
        assert_eq!(title, "Great");
        assert_eq!(comment, "Love it");
    }

    #[test]
    fn test_parse_review_rejects_bad_input() {
        assert!(parse_review(&form(&[("rating", "6"), ("title", "t"), ("comment", "c")])).is_err());
        assert!(parse_review(&form(&[("rating", "x"), ("title", "t"), ("comment", "c")])).is_err());
        assert!(parse_review(&form(&[("rating", "3"), ("comment", "c")])).is_err());
        let long = "a".repeat(MAX_REVIEW_TITLE + 1);
        assert!(
            parse_review(&form(&[("rating", "3"), ("title", &long), ("comment", "c")])).is_err()
        );
    }
}
