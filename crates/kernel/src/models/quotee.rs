//! Quotee model: the person a quote is attributed to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Quotee record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quotee {
    pub id: Uuid,
    pub name: String,
    pub created: i64,
}

impl Quotee {
    /// Find a quotee by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let quotee =
            sqlx::query_as::<_, Quotee>("SELECT id, name, created FROM quotee WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("failed to fetch quotee by id")?;

        Ok(quotee)
    }
}
