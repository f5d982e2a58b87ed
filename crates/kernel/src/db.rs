//! Database connection pool management and schema bootstrap.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Create the service tables if they do not exist yet.
///
/// Idempotent DDL, not a migration system: the schema is three small tables
/// owned entirely by this service.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    const SCHEMA: &[&str] = &[
        r#"
        CREATE TABLE IF NOT EXISTS quotee (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            created BIGINT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS category (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            created BIGINT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS quote (
            id UUID PRIMARY KEY,
            quote_content TEXT NOT NULL,
            quotee_id UUID NOT NULL REFERENCES quotee(id),
            category_id UUID NOT NULL REFERENCES category(id),
            keywords TEXT,
            created BIGINT NOT NULL,
            changed BIGINT NOT NULL
        )
        "#,
    ];

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to apply schema statement")?;
    }

    Ok(())
}
