use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fedsql::ast::Value;
use fedsql::config::{EngineConfig, RetryPolicy};
use fedsql::connector::Connection;
use fedsql::error::FedError;
use fedsql::exec::{execute, Cancellation};
use fedsql::logging::{CapturingLogger, Logger};
use fedsql::plan::cost::Cost;
use fedsql::plan::physical::{ExecutionPlan, ExecutionStage};

struct FlakyConnection {
    attempts: AtomicU32,
}

impl Connection for FlakyConnection {
    fn execute(&self, _sql: &str) -> fedsql::FedResult<(Vec<String>, Vec<Vec<Value>>)> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(FedError::transient_source("connection reset by peer"))
        } else {
            Ok((vec!["id".to_string()], vec![vec![Value::Number("1".to_string(), false)]]))
        }
    }
}

fn single_stage_plan() -> ExecutionPlan {
    ExecutionPlan {
        id: "plan-1".to_string(),
        query_id: "q1".to_string(),
        stages: vec![ExecutionStage {
            id: "scan".to_string(),
            data_source_id: "pg1".to_string(),
            pushed_sql: Some("SELECT id FROM accounts".to_string()),
            local_ops: vec![],
            estimated_rows: 1.0,
            estimated_cost: Cost::for_scan(1.0),
        }],
        root_stage_id: "scan".to_string(),
        intermediate_result_limit: 100_000,
        estimated_cost: Cost::for_scan(1.0),
    }
}

#[test]
fn a_transient_failure_is_retried_and_the_query_still_succeeds() {
    let plan = single_stage_plan();
    let mut connections: HashMap<String, Arc<dyn Connection>> = HashMap::new();
    connections.insert("pg1".to_string(), Arc::new(FlakyConnection { attempts: AtomicU32::new(0) }));

    let policy = RetryPolicy { max_retries: 2, initial_delay: Duration::from_millis(1), multiplier: 1.0 };
    let config = EngineConfig::builder().retry_policy(policy).build();
    let cancellation = Cancellation::new();
    let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());

    let result = execute(&plan, &connections, &config, &cancellation, &logger).unwrap();

    assert!(result.success);
    assert_eq!(result.row_count, 1);
}

#[test]
fn exhausting_retries_surfaces_as_a_failed_result_not_an_error() {
    struct AlwaysFails;
    impl Connection for AlwaysFails {
        fn execute(&self, _sql: &str) -> fedsql::FedResult<(Vec<String>, Vec<Vec<Value>>)> {
            Err(FedError::transient_source("still down"))
        }
    }

    let plan = single_stage_plan();
    let mut connections: HashMap<String, Arc<dyn Connection>> = HashMap::new();
    connections.insert("pg1".to_string(), Arc::new(AlwaysFails));

    let policy = RetryPolicy { max_retries: 1, initial_delay: Duration::from_millis(1), multiplier: 1.0 };
    let config = EngineConfig::builder().retry_policy(policy).build();
    let cancellation = Cancellation::new();
    let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());

    let result = execute(&plan, &connections, &config, &cancellation, &logger).unwrap();

    assert!(!result.success);
    assert!(result.error_message.unwrap().contains("still down"));
}
