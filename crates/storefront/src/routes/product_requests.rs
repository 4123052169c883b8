//! Product request submissions.
//!
//! Anyone may ask for a product the shop does not carry; signed-in users
//! are attached to their request.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use tracing::instrument;

use bazaar_core::Price;

use crate::db::ProductRequestRepository;
use crate::db::product_requests::NewProductRequest;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::ProductRequest;
use crate::routes::extract::MultipartForm;
use crate::services::media::MediaKind;
use crate::state::AppState;

const MAX_PRODUCT_NAME: usize = 200;

fn parse_request(form: &MultipartForm) -> Result<(String, String, Option<Price>)> {
    let product_name = form.required("product_name")?;
    if product_name.chars().count() > MAX_PRODUCT_NAME {
        return Err(AppError::BadRequest(format!(
            "product_name must be at most {MAX_PRODUCT_NAME} characters"
        )));
    }

    let desired_price = form
        .text("desired_price")
        .map(Price::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("desired_price: {e}")))?;

    Ok((
        product_name.to_owned(),
        form.text("details").unwrap_or_default().to_owned(),
        desired_price,
    ))
}

/// Submit a product request (multipart: `product_name`, `details`,
/// `desired_price`, optional `reference_image`).
#[instrument(skip(state, user, multipart))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductRequest>)> {
    let mut form = MultipartForm::read(multipart, "reference_image").await?;
    let (product_name, details, desired_price) = parse_request(&form)?;

    let reference_image = match form.take_file() {
        Some(data) => Some(
            state
                .media()
                .store_image(MediaKind::ProductRequest, &data)
                .await?,
        ),
        None => None,
    };

    let request = NewProductRequest {
        user_id: user.map(|u| u.id),
        product_name,
        details,
        desired_price,
        reference_image,
    };

    let created = match ProductRequestRepository::new(state.pool())
        .create(&request)
        .await
    {
        Ok(created) => created,
        Err(err) => {
            if let Some(path) = &request.reference_image {
                if let Err(e) = state.media().delete(path).await {
                    tracing::warn!(error = %e, path = %path, "Failed to remove orphaned upload");
                }
            }
            return Err(err.into());
        }
    };

    tracing::info!(request_id = %created.id, "Product request received");
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let mut form = MultipartForm::default();
        form.insert_field("product_name", " Walnut desk tidy ");
        form.insert_field("desired_price", "24.50");
        let (name, details, price) = parse_request(&form).unwrap();
        assert_eq!(name, "Walnut desk tidy");
        assert_eq!(details, "");
        assert_eq!(price, Some(Price::parse("24.50").unwrap()));
    }

    #[test]
    fn test_parse_request_rejects_bad_price_and_missing_name() {
        let mut form = MultipartForm::default();
        form.insert_field("product_name", "Lamp");
        form.insert_field("desired_price", "-3");
        assert!(parse_request(&form).is_err());

        assert!(parse_request(&MultipartForm::default()).is_err());
    }
}
