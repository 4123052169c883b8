//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::UserRepository;
use crate::db::orders::ShippingDetails;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::order::Order;
use crate::routes::extract::ApiJson;
use crate::routes::phone_errors;
use crate::services::cart::CartStore;
use crate::services::checkout;
use crate::state::AppState;

/// Optional shipping details. Address and phone fall back to the profile.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutBody {
    pub shipping_address: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Place an order for the session cart.
///
/// The cart is cleared only once the order is committed.
#[instrument(skip(state, session, user, body), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<(StatusCode, Json<Order>)> {
    let mut shipping_address = non_blank(body.shipping_address);
    let mut phone = non_blank(body.phone);
    if let Some(given) = &phone {
        let errors = phone_errors(given);
        if !errors.is_empty() {
            return Err(AppError::BadRequest(errors.join("; ")));
        }
    }

    let store = CartStore::new(state.pool(), &session);
    let cart = store.load().await?;
    if shipping_address.is_none() || phone.is_none() {
        let profile = UserRepository::new(state.pool())
            .get_profile(user.id)
            .await?;
        shipping_address.get_or_insert(profile.address);
        phone.get_or_insert(profile.phone);
    }

    let shipping = ShippingDetails {
        shipping_address: shipping_address.unwrap_or_default(),
        phone: phone.unwrap_or_default(),
        notes: non_blank(body.notes).unwrap_or_default(),
    };

    let order = checkout::place_order(state.pool(), user.id, &cart, &shipping).await?;
    store.clear(Some(user.id)).await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", &order.id.to_string())]),
    );

    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(Some(" 1 Main St ".into())), Some("1 Main St".into()));
    }

    #[test]
    fn test_checkout_body_fields_are_optional() {
        let body: CheckoutBody = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert!(body.shipping_address.is_none());
        assert!(body.notes.is_none());
    }
}
