//! Volcano-model executor: turns a `plan::physical::ExecutionPlan`
//! into a concrete `Operator` tree and pulls it to completion, producing a
//! `QueryResult`. Each stage is either a pushed SQL string run over a
//! `Connection` or a tree of local operators pulled row by row.

pub mod aggregate;
pub mod cancellation;
pub mod eval;
pub mod filter;
pub mod join;
pub mod limit;
pub mod limiter;
pub mod operator;
pub mod project;
pub mod retry;
pub mod row;
pub mod sort;
pub mod table_scan;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::connector::Connection;
use crate::error::{FedError, FedResult};
use crate::logging::Logger;
use crate::plan::physical::{ExecutionPlan, ExecutionStage, LocalOp};

pub use cancellation::Cancellation;
pub use limiter::Limiter;
pub use operator::{Operator, OperatorLifecycle, OperatorState};
pub use row::{QueryResult, Row};

/// Runs `plan` to completion against `connections` (one open `Connection`
/// per data source name the plan's pushed stages reference), returning a
/// materialized `QueryResult`. Cancellable via `cancellation`; `config`
/// supplies the retry policy and the shared intermediate-result cap.
pub fn execute(
    plan: &ExecutionPlan,
    connections: &HashMap<String, Arc<dyn Connection>>,
    config: &EngineConfig,
    cancellation: &Cancellation,
    logger: &Arc<dyn Logger>,
) -> FedResult<QueryResult> {
    let started = Instant::now();
    let limiter = Limiter::new(config.max_intermediate_rows, logger.clone());

    match run(plan, connections, config, cancellation, logger, &limiter) {
        Ok((column_names, rows)) => {
            let column_types = vec!["unknown".to_string(); column_names.len()];
            Ok(QueryResult::success(column_names, column_types, rows, started.elapsed().as_millis() as u64))
        }
        Err(err) => Ok(QueryResult::failure(err.to_string(), started.elapsed().as_millis() as u64)),
    }
}

fn run(
    plan: &ExecutionPlan,
    connections: &HashMap<String, Arc<dyn Connection>>,
    config: &EngineConfig,
    cancellation: &Cancellation,
    logger: &Arc<dyn Logger>,
    limiter: &Limiter,
) -> FedResult<(Vec<String>, Vec<Vec<crate::ast::Value>>)> {
    cancellation.check()?;
    let mut operator = build_stage_operator(plan, plan.root(), connections, config, cancellation, logger, limiter)?;

    operator.open()?;
    let mut column_names = Vec::new();
    let mut rows = Vec::new();
    while operator.has_next()? {
        let row = operator.next()?;
        if column_names.is_empty() {
            column_names = row.column_names.clone();
        }
        rows.push(row.values);
    }
    operator.close()?;
    Ok((column_names, rows))
}

fn connection_for<'a>(
    connections: &'a HashMap<String, Arc<dyn Connection>>,
    data_source_id: &str,
) -> FedResult<Arc<dyn Connection>> {
    connections
        .get(data_source_id)
        .cloned()
        .ok_or_else(|| FedError::Source { message: format!("no open connection for data source '{data_source_id}'"), transient: false, cause: None })
}

/// Builds the operator that produces `stage`'s output: a `TableScan`
/// against its own pushed SQL if it's a pushed stage, or the local operator
/// tree recorded in `stage.local_ops[0]` otherwise.
fn build_stage_operator(
    plan: &ExecutionPlan,
    stage: &ExecutionStage,
    connections: &HashMap<String, Arc<dyn Connection>>,
    config: &EngineConfig,
    cancellation: &Cancellation,
    logger: &Arc<dyn Logger>,
    limiter: &Limiter,
) -> FedResult<Box<dyn Operator>> {
    if let Some(sql) = &stage.pushed_sql {
        let connection = connection_for(connections, &stage.data_source_id)?;
        return Ok(Box::new(table_scan::TableScan::new(
            connection,
            sql.clone(),
            config.retry_policy.clone(),
            cancellation.clone(),
            logger.clone(),
        )));
    }

    let op = stage.local_ops.first().ok_or_else(|| FedError::Plan {
        message: format!("stage '{}' has neither pushed SQL nor a local operator tree", stage.id),
    })?;
    build_local_operator(plan, op, connections, config, cancellation, logger, limiter)
}

fn build_local_operator(
    plan: &ExecutionPlan,
    op: &LocalOp,
    connections: &HashMap<String, Arc<dyn Connection>>,
    config: &EngineConfig,
    cancellation: &Cancellation,
    logger: &Arc<dyn Logger>,
    limiter: &Limiter,
) -> FedResult<Box<dyn Operator>> {
    match op {
        LocalOp::TableScan { stage_id } => {
            let referenced = plan
                .stages
                .iter()
                .find(|s| &s.id == stage_id)
                .ok_or_else(|| FedError::Plan { message: format!("plan references unknown stage '{stage_id}'") })?;
            build_stage_operator(plan, referenced, connections, config, cancellation, logger, limiter)
        }
        LocalOp::Filter { input, predicate } => {
            let child = build_local_operator(plan, input, connections, config, cancellation, logger, limiter)?;
            Ok(Box::new(filter::Filter::new(child, predicate.clone())))
        }
        LocalOp::Project { input, items } => {
            let child = build_local_operator(plan, input, connections, config, cancellation, logger, limiter)?;
            Ok(Box::new(project::Project::new(child, items.clone())))
        }
        LocalOp::Join { left, right, constraint, kind } => {
            let left_op = build_local_operator(plan, left, connections, config, cancellation, logger, limiter)?;
            let right_op = build_local_operator(plan, right, connections, config, cancellation, logger, limiter)?;
            Ok(Box::new(join::Join::new(left_op, right_op, constraint.clone(), *kind, limiter.clone())))
        }
        LocalOp::Aggregate { input, group_by, projection } => {
            let child = build_local_operator(plan, input, connections, config, cancellation, logger, limiter)?;
            Ok(Box::new(aggregate::Aggregate::new(child, group_by.clone(), projection.clone(), limiter.clone())))
        }
        LocalOp::Sort { input, order_by } => {
            let child = build_local_operator(plan, input, connections, config, cancellation, logger, limiter)?;
            Ok(Box::new(sort::Sort::new(child, order_by.clone(), limiter.clone())))
        }
        LocalOp::Limit { input, limit, offset } => {
            let child = build_local_operator(plan, input, connections, config, cancellation, logger, limiter)?;
            Ok(Box::new(limit::Limit::new(child, limit.clone(), offset.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Value;
    use crate::logging::CapturingLogger;

    struct StaticConnection {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    }

    impl Connection for StaticConnection {
        fn execute(&self, _sql: &str) -> FedResult<(Vec<String>, Vec<Vec<Value>>)> {
            Ok((self.columns.clone(), self.rows.clone()))
        }
    }

    #[test]
    fn executes_a_single_pushed_stage_end_to_end() {
        let plan = ExecutionPlan {
            id: "plan-1".to_string(),
            query_id: "q1".to_string(),
            stages: vec![ExecutionStage {
                id: "stage-1".to_string(),
                data_source_id: "pg1".to_string(),
                pushed_sql: Some("SELECT * FROM users".to_string()),
                local_ops: vec![],
                estimated_rows: 2.0,
                estimated_cost: crate::plan::cost::Cost::for_scan(2.0),
            }],
            root_stage_id: "stage-1".to_string(),
            intermediate_result_limit: 100_000,
            estimated_cost: crate::plan::cost::Cost::for_scan(2.0),
        };

        let mut connections: HashMap<String, Arc<dyn Connection>> = HashMap::new();
        connections.insert(
            "pg1".to_string(),
            Arc::new(StaticConnection {
                columns: vec!["id".to_string()],
                rows: vec![vec![Value::Number("1".to_string(), false)], vec![Value::Number("2".to_string(), false)]],
            }),
        );

        let config = EngineConfig::default();
        let cancellation = Cancellation::new();
        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
        let result = execute(&plan, &connections, &config, &cancellation, &logger).unwrap();

        assert!(result.success);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.column_names, vec!["id".to_string()]);
    }

    #[test]
    fn missing_connection_surfaces_as_a_failed_result_not_a_panic() {
        let plan = ExecutionPlan {
            id: "plan-1".to_string(),
            query_id: "q1".to_string(),
            stages: vec![ExecutionStage {
                id: "stage-1".to_string(),
                data_source_id: "pg1".to_string(),
                pushed_sql: Some("SELECT 1".to_string()),
                local_ops: vec![],
                estimated_rows: 1.0,
                estimated_cost: crate::plan::cost::Cost::for_scan(1.0),
            }],
            root_stage_id: "stage-1".to_string(),
            intermediate_result_limit: 100_000,
            estimated_cost: crate::plan::cost::Cost::for_scan(1.0),
        };

        let connections: HashMap<String, Arc<dyn Connection>> = HashMap::new();
        let config = EngineConfig::default();
        let cancellation = Cancellation::new();
        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
        let result = execute(&plan, &connections, &config, &cancellation, &logger).unwrap();

        assert!(!result.success);
        assert!(result.error_message.is_some());
    }
}
