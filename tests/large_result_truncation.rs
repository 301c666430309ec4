use std::collections::HashMap;
use std::sync::Arc;

use fedsql::ast::{Expr, Ident, OrderByExpr, Value};
use fedsql::config::EngineConfig;
use fedsql::connector::Connection;
use fedsql::exec::{execute, Cancellation};
use fedsql::logging::{CapturingLogger, Logger};
use fedsql::plan::cost::Cost;
use fedsql::plan::physical::{ExecutionPlan, ExecutionStage, LocalOp, LOCAL_SOURCE};

struct WideConnection {
    row_count: i64,
}

impl Connection for WideConnection {
    fn execute(&self, _sql: &str) -> fedsql::FedResult<(Vec<String>, Vec<Vec<Value>>)> {
        let rows = (0..self.row_count).map(|n| vec![Value::Number(n.to_string(), false)]).collect();
        Ok((vec!["n".to_string()], rows))
    }
}

#[test]
fn sorting_150k_rows_truncates_to_the_configured_cap_and_logs_it() {
    let scan_stage = ExecutionStage {
        id: "scan".to_string(),
        data_source_id: "src1".to_string(),
        pushed_sql: Some("SELECT n FROM wide_table".to_string()),
        local_ops: vec![],
        estimated_rows: 150_000.0,
        estimated_cost: Cost::for_scan(150_000.0),
    };
    let sort_stage = ExecutionStage {
        id: "sort".to_string(),
        data_source_id: LOCAL_SOURCE.to_string(),
        pushed_sql: None,
        local_ops: vec![LocalOp::Sort {
            input: Box::new(LocalOp::TableScan { stage_id: "scan".to_string() }),
            order_by: vec![OrderByExpr { expr: Expr::Identifier(Ident::new("n")), asc: None, nulls_first: None }],
        }],
        estimated_rows: 150_000.0,
        estimated_cost: Cost::for_scan(150_000.0),
    };
    let plan = ExecutionPlan {
        id: "plan-1".to_string(),
        query_id: "q1".to_string(),
        stages: vec![scan_stage, sort_stage],
        root_stage_id: "sort".to_string(),
        intermediate_result_limit: 100_000,
        estimated_cost: Cost::for_scan(150_000.0),
    };

    let mut connections: HashMap<String, Arc<dyn Connection>> = HashMap::new();
    connections.insert("src1".to_string(), Arc::new(WideConnection { row_count: 150_000 }));

    let config = EngineConfig::default();
    let cancellation = Cancellation::new();
    let capturing = Arc::new(CapturingLogger::new());
    let logger: Arc<dyn Logger> = capturing.clone();
    let result = execute(&plan, &connections, &config, &cancellation, &logger).unwrap();

    assert!(result.success);
    assert_eq!(result.row_count, 100_000);
    assert!(capturing.contains("Intermediate result limited to 100000 rows (total: 150000)"));
}
