//! Newsletter subscribers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_storefront::db::NewsletterRepository;
use bazaar_storefront::error::Result;
use bazaar_storefront::models::NewsletterSubscriber;

use crate::middleware::RequireStaff;
use crate::routes::ListParams;
use crate::state::AdminState;

/// Subscriber listing query. `active=true` hides unsubscribed addresses.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriberQuery {
    #[serde(default)]
    pub active: Option<String>,
    #[serde(flatten)]
    pub list: ListParams,
}

impl SubscriberQuery {
    fn only_active(&self) -> bool {
        matches!(self.active.as_deref(), Some("true" | "1" | "yes"))
    }
}

/// Subscribers newest first.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AdminState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<SubscriberQuery>,
) -> Result<Json<Vec<NewsletterSubscriber>>> {
    let subscribers = NewsletterRepository::new(state.pool())
        .list(query.only_active(), query.list.limit(), query.list.offset())
        .await?;
    Ok(Json(subscribers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active() {
        let query = |active: Option<&str>| SubscriberQuery {
            active: active.map(str::to_owned),
            list: ListParams::default(),
        };
        assert!(query(Some("true")).only_active());
        assert!(!query(Some("false")).only_active());
        assert!(!query(None).only_active());
    }
}
