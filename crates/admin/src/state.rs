//! Application state shared across handlers.

use std::sync::Arc;

use bazaar_storefront::services::media::MediaStorage;
use sqlx::PgPool;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AdminState {
    inner: Arc<AdminStateInner>,
}

struct AdminStateInner {
    config: AdminConfig,
    pool: PgPool,
    media: MediaStorage,
}

impl AdminState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let media = MediaStorage::new(&config.media);
        Self {
            inner: Arc::new(AdminStateInner {
                config,
                pool,
                media,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the upload storage.
    #[must_use]
    pub fn media(&self) -> &MediaStorage {
        &self.inner.media
    }
}
