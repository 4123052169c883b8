//! Newsletter subscription repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use bazaar_core::{Email, SubscriberId};

use super::RepositoryError;
use crate::models::engagement::NewsletterSubscriber;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: SubscriberId,
    email: String,
    subscribed: bool,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriberRow> for NewsletterSubscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid subscriber email: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email,
            subscribed: row.subscribed,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        })
    }
}

/// What a subscribe call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Created,
    /// A previously unsubscribed address was switched back on.
    Reactivated,
    AlreadySubscribed,
}

/// Repository for `shop.newsletter_subscriber`.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscribe(&self, email: &Email) -> Result<SubscribeOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(bool,)> = sqlx::query_as(
            "SELECT subscribed FROM shop.newsletter_subscriber WHERE email = $1 FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some((true,)) => SubscribeOutcome::AlreadySubscribed,
            Some((false,)) => {
                sqlx::query(
                    r"
                    UPDATE shop.newsletter_subscriber
                    SET subscribed = TRUE, subscribed_at = NOW(), unsubscribed_at = NULL
                    WHERE email = $1
                    ",
                )
                .bind(email)
                .execute(&mut *tx)
                .await?;
                SubscribeOutcome::Reactivated
            }
            None => {
                // A concurrent first subscribe of the same address lands here too.
                let result = sqlx::query(
                    r"
                    INSERT INTO shop.newsletter_subscriber (email)
                    VALUES ($1)
                    ON CONFLICT (email) DO NOTHING
                    ",
                )
                .bind(email)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 1 {
                    SubscribeOutcome::Created
                } else {
                    SubscribeOutcome::AlreadySubscribed
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Unsubscribe an address. Returns `false` if it was not subscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.newsletter_subscriber
            SET subscribed = FALSE, unsubscribed_at = NOW()
            WHERE email = $1 AND subscribed
            ",
        )
        .bind(email)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        only_active: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NewsletterSubscriber>, RepositoryError> {
        sqlx::query_as::<_, SubscriberRow>(
            r"
            SELECT id, email, subscribed, subscribed_at, unsubscribed_at
            FROM shop.newsletter_subscriber
            WHERE (NOT $1 OR subscribed)
            ORDER BY subscribed_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(only_active)
        .bind(super::limit(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(NewsletterSubscriber::try_from)
        .collect()
    }
}
