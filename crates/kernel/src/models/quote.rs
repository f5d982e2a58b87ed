//! Quote model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Quote record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quote {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// The quoted text.
    pub quote_content: String,

    /// Person the quote is attributed to.
    pub quotee_id: Uuid,

    /// Category the quote belongs to.
    pub category_id: Uuid,

    /// Space-separated search keywords.
    pub keywords: Option<String>,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Input for creating or replacing a quote.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuote {
    pub quote_content: String,
    pub quotee_id: Uuid,
    pub category_id: Uuid,
    pub keywords: Option<String>,
}

impl Quote {
    /// Create a new quote.
    pub async fn create(pool: &PgPool, input: CreateQuote) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let quote = sqlx::query_as::<_, Quote>(
            r#"
            INSERT INTO quote (id, quote_content, quotee_id, category_id, keywords, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, quote_content, quotee_id, category_id, keywords, created, changed
            "#,
        )
        .bind(id)
        .bind(&input.quote_content)
        .bind(input.quotee_id)
        .bind(input.category_id)
        .bind(&input.keywords)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create quote")?;

        Ok(quote)
    }

    /// Find a quote by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let quote = sqlx::query_as::<_, Quote>(
            "SELECT id, quote_content, quotee_id, category_id, keywords, created, changed FROM quote WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch quote by id")?;

        Ok(quote)
    }

    /// Replace a quote's content. Returns None when the quote does not exist.
    pub async fn update(pool: &PgPool, id: Uuid, input: CreateQuote) -> Result<Option<Self>> {
        let now = chrono::Utc::now().timestamp();

        let quote = sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quote
            SET quote_content = $1, quotee_id = $2, category_id = $3, keywords = $4, changed = $5
            WHERE id = $6
            RETURNING id, quote_content, quotee_id, category_id, keywords, created, changed
            "#,
        )
        .bind(&input.quote_content)
        .bind(input.quotee_id)
        .bind(input.category_id)
        .bind(&input.keywords)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update quote")?;

        Ok(quote)
    }

    /// Delete a quote. Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quote WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete quote")?;

        Ok(result.rows_affected() > 0)
    }
}
