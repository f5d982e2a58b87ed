//! Query assembly using SeaQuery.
//!
//! Applies a resolved [`QueryPlan`] to a `SelectStatement` in a fixed,
//! order-dependent sequence: selected columns, joins, where clauses (like
//! before match), order bys, limit, offset. Selects and joins must exist
//! before the where and order-by steps can reference joined columns, and
//! the offset is limit-scaled, so the limit resolves first.
//!
//! What an include means — which columns it selects, which tables it
//! joins — differs per resource and is delegated to a [`ResourcePolicy`].

use std::collections::BTreeSet;

use sea_query::{Alias, Expr, ExprTrait, Order, Query, SelectStatement, SimpleExpr};

use super::types::{QueryConfig, QueryPlan, SortDirection};

/// Per-resource policy: gives includes their concrete meaning and maps
/// executed result rows to API objects.
///
/// Implemented once per resource and composed with the generic assembler —
/// column aliases chosen by `add_selects` must agree with the joins added
/// by `add_joins`.
pub trait ResourcePolicy: Send + Sync {
    /// Add selected columns for the resolved includes.
    fn add_selects(&self, query: &mut SelectStatement, includes: &BTreeSet<String>);

    /// Add joins for the resolved includes.
    fn add_joins(&self, query: &mut SelectStatement, includes: &BTreeSet<String>);

    /// Map executed result rows to API objects.
    fn filter(&self, rows: Vec<serde_json::Value>) -> Vec<serde_json::Value>;
}

/// Assembles a `SelectStatement` from a resolved plan.
///
/// The statement is owned by the single `build` call; the assembler itself
/// holds only shared references and is freely reusable across requests.
pub struct QueryAssembler<'a> {
    config: &'a QueryConfig,
    policy: &'a dyn ResourcePolicy,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(config: &'a QueryConfig, policy: &'a dyn ResourcePolicy) -> Self {
        Self { config, policy }
    }

    /// Build the statement for one request plan.
    pub fn build(&self, plan: &QueryPlan) -> SelectStatement {
        let mut query = Query::select();

        query.from(Alias::new(&self.config.table));

        self.policy.add_selects(&mut query, &plan.includes);
        self.policy.add_joins(&mut query, &plan.includes);
        self.add_where_clauses(&mut query, plan);
        self.add_order_bys(&mut query, plan);
        self.add_limit(&mut query, plan);
        self.add_offset(&mut query, plan);

        query
    }

    /// Like clauses first, then match clauses.
    fn add_where_clauses(&self, query: &mut SelectStatement, plan: &QueryPlan) {
        self.parse_like_clauses(query, plan);
        self.parse_match_clauses(query, plan);
    }

    fn parse_match_clauses(&self, query: &mut SelectStatement, plan: &QueryPlan) {
        for (name, value) in &plan.match_clauses {
            let Some(column) = self.config.clauses.match_clauses.get(name) else {
                continue;
            };
            query.and_where(self.column_expr(column).eq(value));
        }
    }

    /// Substring clauses. `+` and `,` read as spaces; the clause named
    /// `keywords` splits the substituted value and matches every token
    /// conjunctively on the same column.
    fn parse_like_clauses(&self, query: &mut SelectStatement, plan: &QueryPlan) {
        for (name, value) in &plan.like_clauses {
            let Some(column) = self.config.clauses.like_clauses.get(name) else {
                continue;
            };

            let term = value.replace(['+', ','], " ");

            if name == "keywords" {
                for keyword in term.split_whitespace() {
                    query.and_where(
                        self.column_expr(column)
                            .like(format!("%{}%", escape_like_wildcards(keyword))),
                    );
                }
                continue;
            }

            query.and_where(
                self.column_expr(column)
                    .like(format!("%{}%", escape_like_wildcards(&term))),
            );
        }
    }

    /// Order bys in plan order — catalogue priority, not request order.
    fn add_order_bys(&self, query: &mut SelectStatement, plan: &QueryPlan) {
        for (_, spec) in &plan.sorts {
            let order = match spec.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };

            match spec.column.split_once('.') {
                Some((table, column)) => {
                    query.order_by((Alias::new(table), Alias::new(column)), order)
                }
                None => query.order_by(
                    (Alias::new(&self.config.table), Alias::new(&spec.column)),
                    order,
                ),
            };
        }
    }

    fn add_limit(&self, query: &mut SelectStatement, plan: &QueryPlan) {
        if !self.config.has_max_records {
            return;
        }

        query.limit(plan.limit);
    }

    fn add_offset(&self, query: &mut SelectStatement, plan: &QueryPlan) {
        if !self.config.has_max_records {
            return;
        }

        query.offset(plan.limit.saturating_mul(plan.offset_multiplier));
    }

    /// Expression for a column, qualified with the base table unless the
    /// catalogue spelled it `table.column`.
    fn column_expr(&self, column: &str) -> SimpleExpr {
        match column.split_once('.') {
            Some((table, column)) => {
                Expr::col((Alias::new(table), Alias::new(column))).into()
            }
            None => Expr::col((Alias::new(&self.config.table), Alias::new(column))).into(),
        }
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
