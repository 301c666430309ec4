//! Hybrid query planner: rule-based rewriting
//! to a fixed point, an optional cost-based join-order search, and the
//! physical stage DAG the executor runs.

pub mod cost;
pub mod logical;
pub mod physical;

pub use cost::{enumerate_join_order, Cost, CostWeights};
pub use logical::{optimize, CardinalityEstimator, UniformEstimator};
pub use physical::{build_plan, ExecutionPlan, ExecutionStage, JoinKind, LocalOp, LOCAL_SOURCE};

use crate::ast::Query;
use crate::catalog::SchemaCatalog;
use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::error::FedResult;

/// Runs the full planning pipeline: RBO to a fixed point, then
/// physical staging, which itself consults CBO for join order when
/// `EngineConfig::cbo_enabled` is set.
pub fn plan(
    query_id: impl Into<String>,
    query: Query,
    catalog: &SchemaCatalog,
    dialect_for_source: &dyn Fn(&str) -> Dialect,
    estimator: &dyn CardinalityEstimator,
    config: &EngineConfig,
) -> FedResult<ExecutionPlan> {
    let optimized = logical::optimize(query, estimator, config.rbo_max_passes);
    build_plan(query_id, &optimized, catalog, dialect_for_source, estimator, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::catalog::{Column, Schema, SchemaType, Table, TableType};
    use crate::dialect::DialectTag;

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
                    name: "orders".to_string(),
                    schema: "public".to_string(),
                    catalog: None,
                    table_type: TableType::Table,
                    remarks: None,
                    columns: vec![col("id", 1), col("total", 2)],
                    indexes: vec![],
                }],
            })
            .unwrap();
        catalog
    }

    fn dialect_for_source(_source: &str) -> Dialect {
        Dialect::for_tag(DialectTag::Postgresql)
    }

    #[test]
    fn plan_runs_rbo_then_stages_a_single_source_query() {
        let catalog = sample_catalog();
        let query = Query {
            with: None,
            body: Box::new(SetExpr::Select(Box::new(Select {
                distinct: false,
                top: None,
                projection: vec![SelectItem::Wildcard],
                into: None,
                from: vec![TableWithJoins {
                    relation: TableFactor::Table {
                        name: ObjectName::single(Ident::new("orders")),
                        alias: None,
                        args: None,
                        with_hints: vec![],
                    },
                    joins: vec![],
                }],
                lateral_views: vec![],
                selection: Some(Expr::BinaryOp {
                    left: Box::new(Expr::Value(Value::Number("1".to_string(), false))),
                    op: BinaryOperator::Plus,
                    right: Box::new(Expr::Value(Value::Number("1".to_string(), false))),
                }),
                group_by: vec![],
                having: None,
            }))),
            order_by: vec![],
            limit: None,
            offset: None,
            fetch: None,
            lock: None,
        };
        let config = EngineConfig::default();
        let estimator = UniformEstimator(50.0);
        let result = plan("q", query, &catalog, &dialect_for_source, &estimator, &config).unwrap();
        assert_eq!(result.stages.len(), 1);
        assert!(result.root().pushed_sql.as_deref().unwrap().contains("WHERE 2"));
    }
}
