//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::services::QuotesService;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Quotes service (catalogues + query execution).
    quotes: Arc<QuotesService>,

    /// Static token guarding mutating routes. None disables the guard.
    api_token: Option<String>,
}

impl AppState {
    /// Initialize state: connect to the database, bootstrap the schema, and
    /// wire the quotes service.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config).await?;

        db::ensure_schema(&pool)
            .await
            .context("failed to bootstrap database schema")?;

        let quotes = QuotesService::new(pool.clone()).context("failed to wire quotes service")?;

        if config.api_token.is_none() {
            warn!("API_TOKEN not set; mutating routes are unauthenticated");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db: pool,
                quotes,
                api_token: config.api_token.clone(),
            }),
        })
    }

    /// Database connection pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Quotes service.
    pub fn quotes(&self) -> &QuotesService {
        &self.inner.quotes
    }

    /// Configured API token, if any.
    pub fn api_token(&self) -> Option<&str> {
        self.inner.api_token.as_deref()
    }

    /// Check database health.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
