//! `TableScan`: the one operator that actually talks to a data
//! source, running either a stage's pushed SQL or a synthesized
//! pass-through scan against its `Connection`. The only operator whose
//! `open`/`next` may block on I/O; every other operator in this module is
//! pure in-memory transformation.

use std::sync::Arc;

use crate::ast::Value;
use crate::config::RetryPolicy;
use crate::connector::Connection;
use crate::error::{FedError, FedResult};
use crate::exec::cancellation::Cancellation;
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::retry::with_retry;
use crate::exec::row::Row;
use crate::logging::Logger;

pub struct TableScan {
    connection: Arc<dyn Connection>,
    sql: String,
    retry_policy: RetryPolicy,
    cancellation: Cancellation,
    logger: Arc<dyn Logger>,
    lifecycle: OperatorLifecycle,
    column_names: Vec<String>,
    rows: std::vec::IntoIter<Vec<Value>>,
    pending: Option<Vec<Value>>,
}

impl TableScan {
    pub fn new(
        connection: Arc<dyn Connection>,
        sql: impl Into<String>,
        retry_policy: RetryPolicy,
        cancellation: Cancellation,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            connection,
            sql: sql.into(),
            retry_policy,
            cancellation,
            logger,
            lifecycle: OperatorLifecycle::new(),
            column_names: Vec::new(),
            rows: Vec::new().into_iter(),
            pending: None,
        }
    }
}

impl Operator for TableScan {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.cancellation.check()?;
        let connection = self.connection.clone();
        let sql = self.sql.clone();
        let (column_names, rows) =
            with_retry(&self.retry_policy, &self.cancellation, &self.logger, || connection.execute(&sql))?;
        self.column_names = column_names;
        self.rows = rows.into_iter();
        self.pending = self.rows.next();
        Ok(())
    }

    fn has_next(&mut self) -> FedResult<bool> {
        self.cancellation.check()?;
        if self.pending.is_none() {
            self.lifecycle.mark_drained();
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> FedResult<Row> {
        self.lifecycle.require_opened_for_next()?;
        self.cancellation.check()?;
        let values = self.pending.take().ok_or_else(|| FedError::Plan {
            message: "TableScan.next() called with no row available; call has_next() first".to_string(),
        })?;
        self.pending = self.rows.next();
        Ok(Row::new(self.column_names.clone(), values))
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::CapturingLogger;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyConnection {
        attempts: AtomicU32,
    }

    impl Connection for FlakyConnection {
        fn execute(&self, _sql: &str) -> FedResult<(Vec<String>, Vec<Vec<Value>>)> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(FedError::transient_source("connection reset"))
            } else {
                Ok((
                    vec!["id".to_string()],
                    vec![vec![Value::Number("1".to_string(), false)], vec![Value::Number("2".to_string(), false)]],
                ))
            }
        }
    }

    #[test]
    fn scan_retries_a_transient_failure_and_yields_rows() {
        let connection = Arc::new(FlakyConnection { attempts: AtomicU32::new(0) });
        let policy = RetryPolicy { max_retries: 2, initial_delay: std::time::Duration::from_millis(1), multiplier: 1.0 };
        let logger: Arc<dyn Logger> = Arc::new(CapturingLogger::new());
        let mut scan = TableScan::new(connection, "SELECT * FROM users", policy, Cancellation::new(), logger);

        scan.open().unwrap();
        let mut seen = 0;
        while scan.has_next().unwrap() {
            scan.next().unwrap();
            seen += 1;
        }
        scan.close().unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn next_without_open_fails() {
        struct NeverCalled;
        impl Connection for NeverCalled {
            fn execute(&self, _sql: &str) -> FedResult<(Vec<String>, Vec<Vec<Value>>)> {
                unreachable!()
            }
        }
        let mut scan = TableScan::new(
            Arc::new(NeverCalled),
            "SELECT 1",
            RetryPolicy::default(),
            Cancellation::new(),
            Arc::new(CapturingLogger::new()),
        );
        assert!(scan.next().is_err());
    }
}
