//! Newsletter subscription route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::Email;

use crate::db::NewsletterRepository;
use crate::db::newsletter::SubscribeOutcome;
use crate::error::{AppError, Result};
use crate::routes::extract::ApiJson;
use crate::state::AppState;

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

/// Subscription result.
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub status: SubscribeOutcome,
}

/// Unsubscribe result.
#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub unsubscribed: bool,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address.".to_string()))
}

/// Subscribe an email address.
///
/// A new address responds 201; reactivating or repeating a subscription
/// responds 200.
#[instrument(skip(state, form))]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SubscribeForm>,
) -> Result<(StatusCode, Json<SubscribeResponse>)> {
    let email = parse_email(&form.email)?;
    let outcome = NewsletterRepository::new(state.pool())
        .subscribe(&email)
        .await?;

    tracing::info!(domain = %email.domain(), ?outcome, "Newsletter subscription");

    let status = match outcome {
        SubscribeOutcome::Created => StatusCode::CREATED,
        SubscribeOutcome::Reactivated | SubscribeOutcome::AlreadySubscribed => StatusCode::OK,
    };
    Ok((status, Json(SubscribeResponse { status: outcome })))
}

/// Unsubscribe an email address. Unknown addresses report `false`.
#[instrument(skip(state, form))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SubscribeForm>,
) -> Result<Json<UnsubscribeResponse>> {
    let email = parse_email(&form.email)?;
    let unsubscribed = NewsletterRepository::new(state.pool())
        .unsubscribe(&email)
        .await?;
    Ok(Json(UnsubscribeResponse { unsubscribed }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_normalizes() {
        let email = parse_email("  News@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "news@example.com");
        assert!(matches!(parse_email("not-an-email"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let body = serde_json::to_value(SubscribeResponse {
            status: SubscribeOutcome::AlreadySubscribed,
        })
        .unwrap();
        assert_eq!(body["status"], "already_subscribed");
    }
}
