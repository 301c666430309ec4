//! Physical planner: turns an RBO/CBO-optimized `Query` into a
//! stage DAG, deciding per sub-tree whether to push a rendered SQL string
//! at a single data source or fall back to a tree of local operators.
//! Splits a query into a fully-pushed sub-plan where possible and a
//! locally-executed remainder where not, in the stage-graph shape this
//! crate's executor consumes.

use std::collections::HashSet;

use crate::ast::*;
use crate::catalog::SchemaCatalog;
use crate::config::EngineConfig;
use crate::convert::{detect_unsupported_features, render_query};
use crate::dialect::Dialect;
use crate::error::{FedError, FedResult};
use crate::plan::cost::Cost;
use crate::plan::logical::CardinalityEstimator;

/// One node of the stage DAG: either a rendered SQL string run at
/// `data_source_id`, or a tree of local operators run in the federated
/// executor. `"local"` is the sentinel `data_source_id` for the latter.
#[derive(Debug, Clone)]
pub struct ExecutionStage {
    pub id: String,
    pub data_source_id: String,
    pub pushed_sql: Option<String>,
    pub local_ops: Vec<LocalOp>,
    pub estimated_rows: f64,
    pub estimated_cost: Cost,
}

pub const LOCAL_SOURCE: &str = "local";

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub id: String,
    pub query_id: String,
    pub stages: Vec<ExecutionStage>,
    pub root_stage_id: String,
    pub intermediate_result_limit: usize,
    pub estimated_cost: Cost,
}

impl ExecutionPlan {
    pub fn root(&self) -> &ExecutionStage {
        self.stages
            .iter()
            .find(|s| s.id == self.root_stage_id)
            .expect("root_stage_id always names a stage this builder produced")
    }
}

/// A tree of local (non-pushed) operators, consumed by `exec`.
/// `TableScan` is a leaf that pulls from a prior stage's output, whether
/// that stage was itself pushed or local.
#[derive(Debug, Clone)]
pub enum LocalOp {
    TableScan { stage_id: String },
    Filter { input: Box<LocalOp>, predicate: Expr },
    Project { input: Box<LocalOp>, items: Vec<SelectItem> },
    Join { left: Box<LocalOp>, right: Box<LocalOp>, constraint: JoinConstraint, kind: JoinKind },
    Aggregate { input: Box<LocalOp>, group_by: Vec<Expr>, projection: Vec<SelectItem> },
    Sort { input: Box<LocalOp>, order_by: Vec<OrderByExpr> },
    Limit { input: Box<LocalOp>, limit: Option<Expr>, offset: Option<Offset> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

/// Builds the physical plan for an already rule/cost-optimized `query`.
/// `dialect_for_source` supplies the rendering dialect for a given data
/// source name (the engine's own wiring, not something this module infers).
pub fn build_plan(
    query_id: impl Into<String>,
    query: &Query,
    catalog: &SchemaCatalog,
    dialect_for_source: &dyn Fn(&str) -> Dialect,
    estimator: &dyn CardinalityEstimator,
    config: &EngineConfig,
) -> FedResult<ExecutionPlan> {
    let mut builder = PlanBuilder { catalog, dialect_for_source, estimator, config, next_id: 0, stages: Vec::new() };
    let root_id = builder.plan_query(query)?;
    let estimated_cost = builder.stage(&root_id).estimated_cost;
    Ok(ExecutionPlan {
        id: format!("plan-{}", builder.next_id),
        query_id: query_id.into(),
        stages: builder.stages,
        root_stage_id: root_id,
        intermediate_result_limit: config.max_intermediate_rows,
        estimated_cost,
    })
}

struct PlanBuilder<'a> {
    catalog: &'a SchemaCatalog,
    dialect_for_source: &'a dyn Fn(&str) -> Dialect,
    estimator: &'a dyn CardinalityEstimator,
    config: &'a EngineConfig,
    next_id: u64,
    stages: Vec<ExecutionStage>,
}

impl<'a> PlanBuilder<'a> {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("stage-{}", self.next_id)
    }

    fn stage(&self, id: &str) -> &ExecutionStage {
        self.stages.iter().find(|s| s.id == id).expect("stage id was produced by this builder")
    }

    /// Push the whole sub-tree iff (a) every leaf names a
    /// single data source, (b) the feature detector finds nothing that
    /// dialect can't render, and (c) the estimated row count fits the
    /// intermediate cap. Otherwise fall back to per-relation scans feeding
    /// a local operator tree.
    fn plan_query(&mut self, query: &Query) -> FedResult<String> {
        let tables = collect_table_names(query);
        let sources = self.resolve_sources(&tables)?;

        if let [only_source] = sources.as_slice() {
            let dialect = (self.dialect_for_source)(only_source);
            let unsupported = detect_unsupported_features(query, &dialect);
            let rows = self.total_scan_rows(&tables);
            if unsupported.is_empty() && rows <= self.config.max_intermediate_rows as f64 {
                let sql = render_query(query, &dialect)?;
                let id = self.fresh_id();
                self.stages.push(ExecutionStage {
                    id: id.clone(),
                    data_source_id: only_source.clone(),
                    pushed_sql: Some(sql),
                    local_ops: vec![],
                    estimated_rows: rows,
                    estimated_cost: Cost::for_scan(rows),
                });
                return Ok(id);
            }
        }

        self.plan_local(query)
    }

    fn resolve_sources(&self, tables: &[String]) -> FedResult<Vec<String>> {
        let mut sources = HashSet::new();
        for table in tables {
            sources.insert(self.catalog.data_source_for_table(table)?.to_string());
        }
        Ok(sources.into_iter().collect())
    }

    fn total_scan_rows(&self, tables: &[String]) -> f64 {
        tables.iter().map(|t| self.estimator.estimate_rows(t)).sum()
    }

    /// Builds a local operator tree: one pushed `TableScan` stage per
    /// base relation (or a nested sub-plan for a derived table), joined,
    /// filtered, projected, sorted, and limited per the outer query.
    fn plan_local(&mut self, query: &Query) -> FedResult<String> {
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select.as_ref(),
            _ => return self.plan_opaque_local(query),
        };
        if select.from.is_empty() {
            return self.plan_opaque_local(query);
        }

        let twj = &select.from[0];
        let (base_op, base_rows, base_cost) = self.plan_relation(&twj.relation)?;
        let base_name = table_factor_name(&twj.relation);

        let mut joined: Vec<(LocalOp, f64, Cost, JoinConstraint, JoinKind)> = Vec::with_capacity(twj.joins.len());
        for join in &twj.joins {
            let (right_op, right_rows, right_cost) = self.plan_relation(&join.relation)?;
            let (constraint, kind) = split_join_operator(&join.join_operator);
            joined.push((right_op, right_rows, right_cost, constraint, kind));
        }

        let order = self.cbo_join_order(base_rows, &base_name, &twj.joins, &joined);
        let mut joined: Vec<Option<(LocalOp, f64, Cost, JoinConstraint, JoinKind)>> =
            joined.into_iter().map(Some).collect();

        let mut op = base_op;
        let mut rows_total = base_rows;
        let mut cost_total = base_cost;
        for i in order {
            let (right_op, right_rows, right_cost, constraint, kind) =
                joined[i].take().expect("each join index used once");
            let equi = matches!(&constraint, JoinConstraint::On(Expr::BinaryOp { op, .. }) if op.is_equality());
            cost_total = cost_total + right_cost + Cost::for_join(rows_total, right_rows, equi);
            rows_total = (rows_total * right_rows * if equi { 0.1 } else { 0.3 }).max(1.0);
            op = LocalOp::Join { left: Box::new(op), right: Box::new(right_op), constraint, kind };
        }

        if let Some(predicate) = &select.selection {
            op = LocalOp::Filter { input: Box::new(op), predicate: predicate.clone() };
        }

        if !select.group_by.is_empty() {
            op = LocalOp::Aggregate {
                input: Box::new(op),
                group_by: select.group_by.clone(),
                projection: select.projection.clone(),
            };
        } else {
            op = LocalOp::Project { input: Box::new(op), items: select.projection.clone() };
        }

        if !query.order_by.is_empty() {
            op = LocalOp::Sort { input: Box::new(op), order_by: query.order_by.clone() };
        }

        if query.limit.is_some() || query.offset.is_some() {
            op = LocalOp::Limit { input: Box::new(op), limit: query.limit.clone(), offset: query.offset.clone() };
        }

        let id = self.fresh_id();
        let limited_rows = query
            .limit
            .as_ref()
            .and_then(|l| expr_as_f64(l))
            .map(|n| rows_total.min(n))
            .unwrap_or(rows_total);
        self.stages.push(ExecutionStage {
            id: id.clone(),
            data_source_id: LOCAL_SOURCE.to_string(),
            pushed_sql: None,
            local_ops: vec![op],
            estimated_rows: limited_rows,
            estimated_cost: cost_total,
        });
        Ok(id)
    }

    /// CBO join-order search, wired in behind `cbo_enabled` so it can be
    /// added as a refinement over RBO-only plans without a behavior change
    /// when disabled. Only reorders when every join's `ON` clause is a
    /// simple equi-predicate between the base relation and that join's own
    /// relation — the same independence condition the heuristic reorder
    /// rule requires before it reorders, so CBO never proposes an order
    /// RBO wouldn't also consider safe.
    fn cbo_join_order(
        &self,
        base_rows: f64,
        base_name: &Option<String>,
        joins: &[Join],
        joined: &[(LocalOp, f64, Cost, JoinConstraint, JoinKind)],
    ) -> Vec<usize> {
        let identity: Vec<usize> = (0..joined.len()).collect();
        if !self.config.cbo_enabled || joined.len() < 2 {
            return identity;
        }
        let Some(base_name) = base_name else { return identity };

        let mut join_names = Vec::with_capacity(joins.len());
        for join in joins {
            match table_factor_name(&join.relation) {
                Some(n) => join_names.push(n),
                None => return identity,
            }
        }

        for join in joins {
            let JoinOperator::Inner(JoinConstraint::On(expr)) = &join.join_operator else { return identity };
            match simple_equi_qualifiers(expr) {
                Some((a, b)) => {
                    let ok = (a == *base_name || join_names.contains(&a)) && (b == *base_name || join_names.contains(&b));
                    if !ok {
                        return identity;
                    }
                }
                None => return identity,
            }
        }

        // The base relation is always the left-deep root (`op` starts as
        // `base_op`); only the order the remaining relations attach in is
        // up for CBO to choose, so only their row estimates are searched.
        let _ = base_rows;
        let rows: Vec<f64> = joined.iter().map(|(_, r, ..)| *r).collect();
        crate::plan::cost::enumerate_join_order(&rows, self.config.cbo_branching_limit)
    }

    /// A query body this planner doesn't decompose further (set operations,
    /// a bare `VALUES` list, or a wrapped sub-`Query`) becomes a single
    /// opaque local stage with no table-scan leaves of its own; `exec`
    /// still has to run it, it just can't be split per data source here.
    fn plan_opaque_local(&mut self, query: &Query) -> FedResult<String> {
        let id = self.fresh_id();
        let sql_hint = render_query(query, &Dialect::ansi())?;
        self.stages.push(ExecutionStage {
            id: id.clone(),
            data_source_id: LOCAL_SOURCE.to_string(),
            pushed_sql: None,
            local_ops: vec![LocalOp::TableScan { stage_id: sql_hint_stage_id(&sql_hint) }],
            estimated_rows: self.config.max_intermediate_rows as f64,
            estimated_cost: Cost::huge(),
        });
        Ok(id)
    }

    fn plan_relation(&mut self, factor: &TableFactor) -> FedResult<(LocalOp, f64, Cost)> {
        match factor {
            TableFactor::Table { name, .. } => {
                let table_name = name.last().map(|i| i.value.clone()).unwrap_or_default();
                let source = self.catalog.data_source_for_table(&table_name)?.to_string();
                let dialect = (self.dialect_for_source)(&source);
                let rows = self.estimator.estimate_rows(&table_name);
                let sql = format!("SELECT * FROM {}", dialect.quote_identifier(&table_name));
                let id = self.fresh_id();
                self.stages.push(ExecutionStage {
                    id: id.clone(),
                    data_source_id: source,
                    pushed_sql: Some(sql),
                    local_ops: vec![],
                    estimated_rows: rows,
                    estimated_cost: Cost::for_scan(rows),
                });
                Ok((LocalOp::TableScan { stage_id: id }, rows, Cost::for_scan(rows)))
            }
            TableFactor::Derived { subquery, .. } => {
                let id = self.plan_query(subquery)?;
                let stage = self.stage(&id);
                Ok((LocalOp::TableScan { stage_id: id.clone() }, stage.estimated_rows, stage.estimated_cost))
            }
            TableFactor::NestedJoin(twj) => {
                let (mut op, mut rows, mut cost) = self.plan_relation(&twj.relation)?;
                for join in &twj.joins {
                    let (right_op, right_rows, right_cost) = self.plan_relation(&join.relation)?;
                    let (constraint, kind) = split_join_operator(&join.join_operator);
                    let equi = matches!(
                        &constraint,
                        JoinConstraint::On(Expr::BinaryOp { op, .. }) if op.is_equality()
                    );
                    cost = cost + right_cost + Cost::for_join(rows, right_rows, equi);
                    rows = (rows * right_rows * if equi { 0.1 } else { 0.3 }).max(1.0);
                    op = LocalOp::Join { left: Box::new(op), right: Box::new(right_op), constraint, kind };
                }
                Ok((op, rows, cost))
            }
            TableFactor::TableFunction { .. } | TableFactor::UNNEST { .. } => Err(FedError::Plan {
                message: "table functions and UNNEST have no pushable or scannable relation yet".to_string(),
            }),
        }
    }
}

fn sql_hint_stage_id(sql: &str) -> String {
    format!("opaque:{}", sql.len())
}

/// A relation's addressable name for CBO's independence check: its alias
/// if aliased, else the table's own name. Derived tables and joins with no
/// alias have no addressable name and make the whole chain ineligible.
fn table_factor_name(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, alias, .. } => Some(
            alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .unwrap_or_else(|| name.last().map(|i| i.value.clone()).unwrap_or_default()),
        ),
        TableFactor::Derived { alias, .. } => alias.as_ref().map(|a| a.name.value.clone()),
        _ => None,
    }
}

/// Matches `a.x = b.y` / `a.x = b.y` shaped equi-predicates, returning the
/// two qualifiers involved. Anything more complex (multi-condition `AND`,
/// a non-equi operator, a bare column) isn't recognized and disqualifies
/// the join chain from CBO reordering.
fn simple_equi_qualifiers(expr: &Expr) -> Option<(String, String)> {
    if let Expr::BinaryOp { left, op, right } = expr {
        if op.is_equality() {
            if let (Expr::CompoundIdentifier(l), Expr::CompoundIdentifier(r)) = (left.as_ref(), right.as_ref()) {
                if l.len() >= 2 && r.len() >= 2 {
                    return Some((l[0].value.clone(), r[0].value.clone()));
                }
            }
        }
    }
    None
}

fn split_join_operator(op: &JoinOperator) -> (JoinConstraint, JoinKind) {
    match op {
        JoinOperator::Inner(c) => (c.clone(), JoinKind::Inner),
        JoinOperator::LeftOuter(c) => (c.clone(), JoinKind::LeftOuter),
        JoinOperator::RightOuter(c) => (c.clone(), JoinKind::RightOuter),
        JoinOperator::FullOuter(c) => (c.clone(), JoinKind::FullOuter),
        JoinOperator::CrossJoin | JoinOperator::CrossApply | JoinOperator::OuterApply => {
            (JoinConstraint::None, JoinKind::Cross)
        }
    }
}

fn expr_as_f64(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n.parse().ok(),
        _ => None,
    }
}

/// Collects every base table name a query's leaves reference, descending
/// into CTEs, derived tables, and nested joins, but not past a pushed
/// boundary (this runs before push/local is decided, so it sees the
/// whole tree).
fn collect_table_names(query: &Query) -> Vec<String> {
    let mut names = Vec::new();
    collect_from_query(query, &mut names);
    names.sort();
    names.dedup();
    names
}

fn collect_from_query(query: &Query, names: &mut Vec<String>) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collect_from_query(&cte.query, names);
        }
    }
    collect_from_set_expr(&query.body, names);
}

fn collect_from_set_expr(set_expr: &SetExpr, names: &mut Vec<String>) {
    match set_expr {
        SetExpr::Select(select) => {
            for twj in &select.from {
                collect_from_table_factor(&twj.relation, names);
                for join in &twj.joins {
                    collect_from_table_factor(&join.relation, names);
                }
            }
        }
        SetExpr::Query(q) => collect_from_query(q, names),
        SetExpr::SetOperation { left, right, .. } => {
            collect_from_set_expr(left, names);
            collect_from_set_expr(right, names);
        }
        SetExpr::Values(_) => {}
    }
}

fn collect_from_table_factor(factor: &TableFactor, names: &mut Vec<String>) {
    match factor {
        TableFactor::Table { name, .. } => {
            if let Some(ident) = name.last() {
                names.push(ident.value.clone());
            }
        }
        TableFactor::Derived { subquery, .. } => collect_from_query(subquery, names),
        TableFactor::NestedJoin(twj) => {
            collect_from_table_factor(&twj.relation, names);
            for join in &twj.joins {
                collect_from_table_factor(&join.relation, names);
            }
        }
        TableFactor::TableFunction { .. } | TableFactor::UNNEST { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, Schema, SchemaType, Table, TableType};
    use crate::dialect::DialectTag;
    use crate::plan::logical::UniformEstimator;

    fn sample_catalog() -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new();
        let col = |name: &str, pos: u32| Column {
            name: name.to_string(),
            data_type: "integer".to_string(),
            native_type: "int4".to_string(),
            nullable: true,
            primary_key: false,
            ordinal_position: pos,
            default_value: None,
        };
        catalog
            .discover(Schema {
                name: "public".to_string(),
                catalog: None,
                schema_type: SchemaType::Physical,
                data_source_name: "pg1".to_string(),
                tables: vec![Table {
                    name: "users".to_string(),
                    schema: "public".to_string(),
                    catalog: None,
                    table_type: TableType::Table,
                    remarks: None,
                    columns: vec![col("id", 1), col("name", 2)],
                    indexes: vec![],
                }],
            })
            .unwrap();
        catalog
            .discover(Schema {
                name: "search".to_string(),
                catalog: None,
                schema_type: SchemaType::Physical,
                data_source_name: "es1".to_string(),
                tables: vec![Table {
                    name: "events".to_string(),
                    schema: "search".to_string(),
                    catalog: None,
                    table_type: TableType::Table,
                    remarks: None,
                    columns: vec![col("id", 1), col("user_id", 2)],
                    indexes: vec![],
                }],
            })
            .unwrap();
        catalog
    }

    fn single_table_query(table: &str) -> Query {
        Query {
            with: None,
            body: Box::new(SetExpr::Select(Box::new(Select {
                distinct: false,
                top: None,
                projection: vec![SelectItem::Wildcard],
                into: None,
                from: vec![TableWithJoins {
                    relation: TableFactor::Table {
                        name: ObjectName::single(Ident::new(table)),
                        alias: None,
                        args: None,
                        with_hints: vec![],
                    },
                    joins: vec![],
                }],
                lateral_views: vec![],
                selection: None,
                group_by: vec![],
                having: None,
            }))),
            order_by: vec![],
            limit: None,
            offset: None,
            fetch: None,
            lock: None,
        }
    }

    fn dialect_for_source(source: &str) -> Dialect {
        match source {
            "pg1" => Dialect::postgresql(),
            "es1" => Dialect::ansi(),
            _ => Dialect::for_tag(DialectTag::Ansi),
        }
    }

    #[test]
    fn single_source_query_pushes_as_one_stage() {
        let catalog = sample_catalog();
        let query = single_table_query("users");
        let config = EngineConfig::default();
        let estimator = UniformEstimator(100.0);
        let plan = build_plan("q1", &query, &catalog, &dialect_for_source, &estimator, &config).unwrap();
        assert_eq!(plan.stages.len(), 1);
        assert!(plan.root().pushed_sql.is_some());
        assert_eq!(plan.root().data_source_id, "pg1");
    }

    #[test]
    fn cross_source_join_falls_back_to_local_stage() {
        let catalog = sample_catalog();
        let mut query = single_table_query("users");
        let SetExpr::Select(select) = query.body.as_mut() else { unreachable!() };
        select.from[0].joins.push(Join {
            relation: TableFactor::Table {
                name: ObjectName::single(Ident::new("events")),
                alias: None,
                args: None,
                with_hints: vec![],
            },
            join_operator: JoinOperator::Inner(JoinConstraint::On(Expr::BinaryOp {
                left: Box::new(Expr::CompoundIdentifier(vec![Ident::new("users"), Ident::new("id")])),
                op: BinaryOperator::Eq,
                right: Box::new(Expr::CompoundIdentifier(vec![Ident::new("events"), Ident::new("user_id")])),
            })),
        });
        let config = EngineConfig::default();
        let estimator = UniformEstimator(100.0);
        let plan = build_plan("q2", &query, &catalog, &dialect_for_source, &estimator, &config).unwrap();
        assert_eq!(plan.root().data_source_id, LOCAL_SOURCE);
        assert_eq!(plan.root().local_ops.len(), 1);
        assert!(matches!(plan.root().local_ops[0], LocalOp::Project { .. }));
        assert_eq!(plan.stages.len(), 3);
    }

    #[test]
    fn oversized_estimate_forces_local_plan_even_for_single_source() {
        let catalog = sample_catalog();
        let query = single_table_query("users");
        let config = EngineConfig::builder().max_intermediate_rows(10).build();
        let estimator = UniformEstimator(1_000.0);
        let plan = build_plan("q3", &query, &catalog, &dialect_for_source, &estimator, &config).unwrap();
        assert_eq!(plan.root().data_source_id, LOCAL_SOURCE);
    }
}
