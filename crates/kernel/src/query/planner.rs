//! Request planning.
//!
//! Derives the four parts of a [`QueryPlan`] — includes, where clauses,
//! sorts, pagination — from the normalized parameters and the static
//! catalogues, then promotes any includes the clauses or sorts depend on.
//!
//! Planning never fails: unknown parameters are dropped, unusable numeric
//! values fall back to defaults, unsupported includes and sort tokens are
//! silently excluded. Strict validation of required request fields belongs
//! to the surrounding HTTP layer.

use std::collections::{BTreeMap, BTreeSet};

use super::params::ParamMap;
use super::types::{QueryConfig, QueryPlan, SortSpec};

/// Derives request plans from parameters against one service's catalogues.
pub struct QueryPlanner<'a> {
    config: &'a QueryConfig,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(config: &'a QueryConfig) -> Self {
        Self { config }
    }

    /// Derive the full request plan, including required-include promotion.
    pub fn plan(&self, params: &ParamMap) -> QueryPlan {
        let (match_clauses, like_clauses) = self.where_clauses(params);

        let mut plan = QueryPlan {
            includes: self.includes(params),
            match_clauses,
            like_clauses,
            sorts: self.sorts(params),
            limit: self.limit(params),
            offset_multiplier: self.offset_multiplier(params),
        };

        self.add_missing_includes(&mut plan);

        plan
    }

    /// Requested includes, intersected with the include catalogue.
    fn includes(&self, params: &ParamMap) -> BTreeSet<String> {
        let Some(raw) = params.get("include") else {
            return BTreeSet::new();
        };

        raw.split(',')
            .filter(|token| self.config.includes.contains_key(*token))
            .map(str::to_string)
            .collect()
    }

    /// Where clauses present in the request, keyed by clause name.
    fn where_clauses(
        &self,
        params: &ParamMap,
    ) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
        let mut match_clauses = BTreeMap::new();
        let mut like_clauses = BTreeMap::new();

        for (name, parameter) in &self.config.clauses.match_clauses {
            if let Some(value) = params.get(parameter) {
                match_clauses.insert(name.clone(), value.to_string());
            }
        }

        for (name, parameter) in &self.config.clauses.like_clauses {
            if let Some(value) = params.get(parameter) {
                like_clauses.insert(name.clone(), value.to_string());
            }
        }

        (match_clauses, like_clauses)
    }

    /// Requested sorts in catalogue priority order. Duplicate request
    /// tokens collapse because each catalogue entry is matched once.
    fn sorts(&self, params: &ParamMap) -> Vec<(String, SortSpec)> {
        let Some(raw) = params.get("sortby") else {
            return Vec::new();
        };

        let requested: Vec<&str> = raw.split(',').collect();

        self.config
            .sorts
            .iter()
            .filter(|(token, _)| requested.contains(&token.as_str()))
            .cloned()
            .collect()
    }

    /// Resolved page size: the request's limit when it is numeric and lands
    /// in `[1, max_records]` after truncation, otherwise the default.
    fn limit(&self, params: &ParamMap) -> u64 {
        let fallback = self.config.default_record_limit;

        let Some(raw) = params.get("limit") else {
            return fallback;
        };
        let Some(value) = parse_numeric(raw) else {
            return fallback;
        };

        let limit = value.trunc();
        if limit < 1.0 || limit > self.config.max_records as f64 {
            return fallback;
        }

        limit as u64
    }

    /// Zero-based page multiplier: truncated `page` minus one, clamped to
    /// zero. Absent or non-numeric pages read as the first page.
    fn offset_multiplier(&self, params: &ParamMap) -> u64 {
        let Some(raw) = params.get("page") else {
            return 0;
        };
        let Some(value) = parse_numeric(raw) else {
            return 0;
        };

        let multiplier = value.trunc() - 1.0;
        if multiplier < 0.0 { 0 } else { multiplier as u64 }
    }

    /// Promote includes that a planned clause or sort depends on.
    ///
    /// Single pass: an include promoted here does not trigger its own
    /// required-include rules. Promotion is idempotent — the include set
    /// absorbs repeats.
    fn add_missing_includes(&self, plan: &mut QueryPlan) {
        let mut operations: BTreeSet<&str> =
            plan.match_clauses.keys().map(String::as_str).collect();
        operations.extend(plan.like_clauses.keys().map(String::as_str));
        operations.extend(plan.sorts.iter().map(|(token, _)| token.as_str()));

        for (include, tokens) in &self.config.required_includes {
            if plan.includes.contains(include) {
                continue;
            }
            if tokens.iter().any(|token| operations.contains(token.as_str())) {
                plan.includes.insert(include.clone());
            }
        }
    }
}

/// Permissive numeric parse: any finite decimal counts.
fn parse_numeric(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::ClauseCatalogue;

    fn config() -> QueryConfig {
        QueryConfig {
            table: "quote".to_string(),
            default_record_limit: 25,
            max_records: 200,
            has_max_records: true,
            includes: BTreeMap::from([
                ("quotee".to_string(), "quotee".to_string()),
                ("category".to_string(), "category".to_string()),
            ]),
            clauses: ClauseCatalogue {
                match_clauses: BTreeMap::from([
                    ("id".to_string(), "id".to_string()),
                    ("quotee".to_string(), "quotee_id".to_string()),
                ]),
                like_clauses: BTreeMap::from([(
                    "keywords".to_string(),
                    "keywords".to_string(),
                )]),
            },
            sorts: vec![
                ("newest".to_string(), SortSpec::desc("created")),
                ("oldest".to_string(), SortSpec::asc("created")),
                ("quotee_asc".to_string(), SortSpec::asc("quotee.name")),
            ],
            required_includes: BTreeMap::from([(
                "quotee".to_string(),
                vec!["quotee".to_string(), "quotee_asc".to_string()],
            )]),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> ParamMap {
        ParamMap::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn includes_intersect_with_catalogue() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[(
            "include",
            "quotee,unknown,category",
        )]));

        assert_eq!(plan.includes.len(), 2);
        assert!(plan.includes.contains("quotee"));
        assert!(plan.includes.contains("category"));
    }

    #[test]
    fn absent_include_parameter_yields_empty_set() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[]));

        assert!(plan.includes.is_empty());
    }

    #[test]
    fn clauses_recorded_by_name_when_parameter_present() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[
            ("quotee_id", "5"),
            ("keywords", "fast"),
            ("unrelated", "x"),
        ]));

        assert_eq!(plan.match_clauses.get("quotee"), Some(&"5".to_string()));
        assert_eq!(plan.like_clauses.get("keywords"), Some(&"fast".to_string()));
        assert_eq!(plan.match_clauses.len(), 1);
        assert_eq!(plan.like_clauses.len(), 1);
    }

    #[test]
    fn parameter_keys_are_case_insensitive() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("QUOTEE_ID", "5")]));

        assert_eq!(plan.match_clauses.get("quotee"), Some(&"5".to_string()));
    }

    #[test]
    fn sorts_follow_catalogue_order_not_request_order() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("sortby", "oldest,newest")]));

        let tokens: Vec<&str> = plan.sorts.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens, vec!["newest", "oldest"]);
    }

    #[test]
    fn unknown_sort_tokens_dropped() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[(
            "sortby",
            "newest,unknown_token",
        )]));

        assert_eq!(plan.sorts.len(), 1);
        assert_eq!(plan.sorts[0].0, "newest");
    }

    #[test]
    fn duplicate_sort_tokens_collapse() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("sortby", "newest,newest")]));

        assert_eq!(plan.sorts.len(), 1);
    }

    #[test]
    fn limit_defaults_when_absent() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[]));

        assert_eq!(plan.limit, 25);
    }

    #[test]
    fn limit_accepts_in_range_values() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("limit", "50")]));

        assert_eq!(plan.limit, 50);
    }

    #[test]
    fn limit_above_max_falls_back_to_default() {
        // The default, not the maximum: an out-of-range request gets the
        // standard page size.
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("limit", "1000")]));

        assert_eq!(plan.limit, 25);
    }

    #[test]
    fn limit_rejects_non_numeric_zero_and_negative() {
        let config = config();
        let planner = QueryPlanner::new(&config);

        assert_eq!(planner.plan(&params(&[("limit", "abc")])).limit, 25);
        assert_eq!(planner.plan(&params(&[("limit", "0")])).limit, 25);
        assert_eq!(planner.plan(&params(&[("limit", "-5")])).limit, 25);
        assert_eq!(planner.plan(&params(&[("limit", "inf")])).limit, 25);
    }

    #[test]
    fn fractional_limit_truncates() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("limit", "10.9")]));

        assert_eq!(plan.limit, 10);
    }

    #[test]
    fn page_converts_to_zero_based_multiplier() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("page", "3")]));

        assert_eq!(plan.offset_multiplier, 2);
    }

    #[test]
    fn page_at_or_below_one_clamps_to_zero() {
        let config = config();
        let planner = QueryPlanner::new(&config);

        assert_eq!(planner.plan(&params(&[("page", "1")])).offset_multiplier, 0);
        assert_eq!(planner.plan(&params(&[("page", "0")])).offset_multiplier, 0);
        assert_eq!(planner.plan(&params(&[("page", "-2")])).offset_multiplier, 0);
        assert_eq!(planner.plan(&params(&[("page", "abc")])).offset_multiplier, 0);
        assert_eq!(planner.plan(&params(&[])).offset_multiplier, 0);
    }

    #[test]
    fn fractional_page_truncates() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("page", "2.7")]));

        assert_eq!(plan.offset_multiplier, 1);
    }

    #[test]
    fn filter_promotes_required_include() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("quotee_id", "5")]));

        assert!(plan.includes.contains("quotee"));
    }

    #[test]
    fn sort_promotes_required_include() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("sortby", "quotee_asc")]));

        assert!(plan.includes.contains("quotee"));
    }

    #[test]
    fn promotion_is_noop_when_include_already_requested() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[
            ("include", "quotee"),
            ("sortby", "quotee_asc"),
        ]));

        assert_eq!(plan.includes.len(), 1);
    }

    #[test]
    fn resolution_is_idempotent() {
        let config = config();
        let planner = QueryPlanner::new(&config);
        let request = params(&[("quotee_id", "5"), ("sortby", "newest")]);

        let mut plan = planner.plan(&request);
        let once = plan.includes.clone();
        planner.add_missing_includes(&mut plan);

        assert_eq!(plan.includes, once);
        assert_eq!(plan, planner.plan(&request));
    }

    #[test]
    fn unrelated_operations_promote_nothing() {
        let config = config();
        let plan = QueryPlanner::new(&config).plan(&params(&[("keywords", "fast")]));

        assert!(plan.includes.is_empty());
    }
}
