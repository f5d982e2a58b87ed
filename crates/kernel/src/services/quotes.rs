//! Quotes service: catalogue wiring and query execution for the quote
//! resource.
//!
//! Owns the static query catalogues, gives includes their concrete meaning
//! via [`ResourcePolicy`], and executes assembled statements against
//! PostgreSQL.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use sea_query::{
    Alias, Asterisk, Expr, ExprTrait, JoinType, PostgresQueryBuilder, SelectStatement,
};
use sqlx::PgPool;

use crate::query::{
    ClauseCatalogue, ParamMap, QueryAssembler, QueryConfig, QueryPlanner, ResourcePolicy, SortSpec,
};

/// Page size when the request carries no usable limit.
const DEFAULT_RECORD_LIMIT: u64 = 25;

/// Largest page size a request may ask for.
const MAX_RECORDS: u64 = 200;

/// Service for querying the quote resource.
pub struct QuotesService {
    pool: PgPool,
    config: QueryConfig,
}

impl QuotesService {
    /// Wire the quotes service, validating its catalogues.
    pub fn new(pool: PgPool) -> Result<Arc<Self>> {
        let config = QueryConfig {
            table: "quote".to_string(),
            default_record_limit: DEFAULT_RECORD_LIMIT,
            max_records: MAX_RECORDS,
            has_max_records: true,
            includes: BTreeMap::from([
                ("quotee".to_string(), "quotee".to_string()),
                ("category".to_string(), "category".to_string()),
            ]),
            clauses: ClauseCatalogue {
                match_clauses: BTreeMap::from([
                    ("id".to_string(), "id".to_string()),
                    ("quotee".to_string(), "quotee_id".to_string()),
                    ("category".to_string(), "category_id".to_string()),
                ]),
                like_clauses: BTreeMap::from([
                    ("keywords".to_string(), "keywords".to_string()),
                    ("content".to_string(), "quote_content".to_string()),
                ]),
            },
            sorts: vec![
                ("newest".to_string(), SortSpec::desc("created")),
                ("oldest".to_string(), SortSpec::asc("created")),
                ("content_asc".to_string(), SortSpec::asc("quote_content")),
                ("content_desc".to_string(), SortSpec::desc("quote_content")),
                ("quotee_asc".to_string(), SortSpec::asc("quotee.name")),
                ("quotee_desc".to_string(), SortSpec::desc("quotee.name")),
            ],
            required_includes: BTreeMap::from([(
                "quotee".to_string(),
                vec!["quotee_asc".to_string(), "quotee_desc".to_string()],
            )]),
        };

        config.validate().context("invalid quote query catalogues")?;

        Ok(Arc::new(Self { pool, config }))
    }

    /// Query catalogues for this resource.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Run the full pipeline for one request: plan, assemble, execute, map.
    pub async fn get_quotes(&self, params: &ParamMap) -> Result<Vec<serde_json::Value>> {
        let plan = QueryPlanner::new(&self.config).plan(params);
        let sql = {
            let statement = QueryAssembler::new(&self.config, self).build(&plan);
            statement.to_string(PostgresQueryBuilder)
        };

        tracing::debug!(%sql, "executing quote query");

        let rows: Vec<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({sql}) t"))
                .fetch_all(&self.pool)
                .await
                .context("failed to execute quote query")?;

        Ok(self.filter(rows))
    }
}

impl ResourcePolicy for QuotesService {
    fn add_selects(&self, query: &mut SelectStatement, includes: &BTreeSet<String>) {
        query.column((Alias::new("quote"), Asterisk));

        if includes.contains("quotee") {
            query.expr_as(
                Expr::col((Alias::new("quotee"), Alias::new("name"))),
                Alias::new("quotee_name"),
            );
        }
        if includes.contains("category") {
            query.expr_as(
                Expr::col((Alias::new("category"), Alias::new("name"))),
                Alias::new("category_name"),
            );
        }
    }

    fn add_joins(&self, query: &mut SelectStatement, includes: &BTreeSet<String>) {
        if includes.contains("quotee") {
            query.join(
                JoinType::InnerJoin,
                Alias::new("quotee"),
                Expr::col((Alias::new("quote"), Alias::new("quotee_id")))
                    .equals((Alias::new("quotee"), Alias::new("id"))),
            );
        }
        if includes.contains("category") {
            query.join(
                JoinType::InnerJoin,
                Alias::new("category"),
                Expr::col((Alias::new("quote"), Alias::new("category_id")))
                    .equals((Alias::new("category"), Alias::new("id"))),
            );
        }
    }

    /// The column stores keywords as text; the API exposes a token array.
    fn filter(&self, mut rows: Vec<serde_json::Value>) -> Vec<serde_json::Value> {
        for row in &mut rows {
            if let Some(object) = row.as_object_mut()
                && let Some(keywords) = object.get("keywords").and_then(|v| v.as_str())
            {
                let tokens: Vec<serde_json::Value> = keywords
                    .split_whitespace()
                    .map(|token| serde_json::Value::String(token.to_string()))
                    .collect();
                object.insert("keywords".to_string(), serde_json::Value::Array(tokens));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Arc<QuotesService> {
        // connect_lazy performs no I/O; these tests never touch a server.
        let pool = PgPool::connect_lazy("postgres://localhost/citato_test").unwrap();
        QuotesService::new(pool).unwrap()
    }

    fn sql_for(service: &QuotesService, pairs: &[(&str, &str)]) -> String {
        let params = ParamMap::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        let plan = QueryPlanner::new(service.config()).plan(&params);
        QueryAssembler::new(service.config(), service)
            .build(&plan)
            .to_string(PostgresQueryBuilder)
    }

    #[tokio::test]
    async fn catalogues_validate() {
        let service = service();
        assert!(service.config().validate().is_ok());
    }

    #[tokio::test]
    async fn default_listing_selects_base_table_with_default_page() {
        let service = service();
        let sql = sql_for(&service, &[]);

        assert!(sql.contains(r#"SELECT "quote".* FROM "quote""#), "{sql}");
        assert!(sql.contains("LIMIT 25"), "{sql}");
        assert!(sql.contains("OFFSET 0"), "{sql}");
    }

    #[tokio::test]
    async fn category_include_adds_join_and_alias() {
        let service = service();
        let sql = sql_for(&service, &[("include", "category")]);

        assert!(sql.contains(r#"INNER JOIN "category""#), "{sql}");
        assert!(sql.contains(r#"AS "category_name""#), "{sql}");
        assert!(!sql.contains(r#"INNER JOIN "quotee""#), "{sql}");
    }

    #[tokio::test]
    async fn quotee_sort_forces_quotee_join() {
        let service = service();
        let sql = sql_for(&service, &[("sortby", "quotee_desc")]);

        assert!(sql.contains(r#"INNER JOIN "quotee""#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "quotee"."name" DESC"#), "{sql}");
    }

    #[tokio::test]
    async fn filter_parameters_map_to_columns() {
        let service = service();
        let sql = sql_for(
            &service,
            &[("quotee_id", "5"), ("category_id", "9"), ("keywords", "fast")],
        );

        assert!(sql.contains(r#""quote"."quotee_id" = '5'"#), "{sql}");
        assert!(sql.contains(r#""quote"."category_id" = '9'"#), "{sql}");
        assert!(sql.contains("%fast%"), "{sql}");
    }

    #[tokio::test]
    async fn filter_splits_keywords_into_token_array() {
        let service = service();
        let rows = vec![serde_json::json!({
            "id": "0193e4a0-0000-7000-8000-000000000000",
            "quote_content": "hello",
            "keywords": "fast car red",
        })];

        let mapped = service.filter(rows);

        assert_eq!(
            mapped[0]["keywords"],
            serde_json::json!(["fast", "car", "red"])
        );
    }

    #[tokio::test]
    async fn filter_leaves_null_keywords_alone() {
        let service = service();
        let rows = vec![serde_json::json!({"id": "x", "keywords": null})];

        let mapped = service.filter(rows);

        assert!(mapped[0]["keywords"].is_null());
    }
}
