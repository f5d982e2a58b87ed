//! Query catalogue and plan types.
//!
//! Catalogues are the static, per-service configuration defining the
//! universe of permitted includes, where clauses, and sorts. A plan is the
//! ephemeral, request-scoped selection out of that universe.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Column + direction pair a sort token maps to.
///
/// Columns may be written `table.column` to reference a joined table; bare
/// names are qualified with the service's base table at assembly time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Where-clause catalogue, grouped by operator kind.
///
/// Each entry maps a clause name (the key the plan is recorded under) to the
/// accepted request parameter, which is also the filtered column.
#[derive(Debug, Clone, Default)]
pub struct ClauseCatalogue {
    /// Exact-equality clauses.
    pub match_clauses: BTreeMap<String, String>,

    /// Substring clauses (`LIKE '%value%'`).
    pub like_clauses: BTreeMap<String, String>,
}

/// Per-service query configuration, fixed at construction and shared
/// read-only across requests.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Base table the service queries.
    pub table: String,

    /// Page size used when the request carries no usable limit.
    pub default_record_limit: u64,

    /// Largest page size a request may ask for. A limit above this falls
    /// back to the default rather than clamping.
    pub max_records: u64,

    /// When false, assembled queries are unbounded: limit and offset are
    /// skipped entirely.
    pub has_max_records: bool,

    /// Permitted includes: include name → the joined table it brings in.
    /// The table is opaque to the planner; the resource policy gives it
    /// meaning.
    pub includes: BTreeMap<String, String>,

    /// Permitted where clauses.
    pub clauses: ClauseCatalogue,

    /// Permitted sort tokens. Vector order defines sort priority in the
    /// assembled query, regardless of request order.
    pub sorts: Vec<(String, SortSpec)>,

    /// Include name → operation tokens (clause or sort names) that force
    /// the include even when the caller did not request it.
    pub required_includes: BTreeMap<String, Vec<String>>,
}

impl QueryConfig {
    /// Check catalogue consistency.
    ///
    /// A defect here is a wiring error, caught once at service
    /// construction — never a request-time failure.
    pub fn validate(&self) -> Result<()> {
        for include in self.required_includes.keys() {
            if !self.includes.contains_key(include) {
                anyhow::bail!("required include '{include}' is not in the include catalogue");
            }
        }

        let mut seen = BTreeSet::new();
        for (token, _) in &self.sorts {
            if !seen.insert(token.as_str()) {
                anyhow::bail!("duplicate sort token '{token}' in the sort catalogue");
            }
        }

        Ok(())
    }
}

/// Request-scoped plan derived from the parameters and the catalogues.
///
/// Built fresh per request, never shared. Every key in the clause maps and
/// every sort token is guaranteed to exist in the corresponding catalogue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Resolved include set (requested plus promoted).
    pub includes: BTreeSet<String>,

    /// Exact-equality clauses: clause name → raw request value.
    pub match_clauses: BTreeMap<String, String>,

    /// Substring clauses: clause name → raw request value.
    pub like_clauses: BTreeMap<String, String>,

    /// Sort entries in catalogue priority order.
    pub sorts: Vec<(String, SortSpec)>,

    /// Resolved page size.
    pub limit: u64,

    /// Zero-based page multiplier; offset = limit × multiplier.
    pub offset_multiplier: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QueryConfig {
        QueryConfig {
            table: "quote".to_string(),
            default_record_limit: 25,
            max_records: 200,
            has_max_records: true,
            includes: BTreeMap::from([("quotee".to_string(), "quotee".to_string())]),
            clauses: ClauseCatalogue::default(),
            sorts: vec![
                ("newest".to_string(), SortSpec::desc("created")),
                ("oldest".to_string(), SortSpec::asc("created")),
            ],
            required_includes: BTreeMap::new(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn required_include_must_exist_in_catalogue() {
        let mut config = config();
        config.required_includes.insert(
            "missing".to_string(),
            vec!["newest".to_string()],
        );

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn duplicate_sort_tokens_rejected() {
        let mut config = config();
        config
            .sorts
            .push(("newest".to_string(), SortSpec::asc("created")));

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("newest"));
    }

    #[test]
    fn sort_spec_helpers() {
        let spec = SortSpec::desc("created");
        assert_eq!(spec.column, "created");
        assert_eq!(spec.direction, SortDirection::Desc);
    }
}
