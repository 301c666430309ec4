//! Row and result-set shapes shared by every operator
//! and by the top-level query result handed back to a caller.

use crate::ast::Value;

/// One row of operator output: positional values paired with the column
/// names the owning operator produced them under.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
    pub column_names: Vec<String>,
}

impl Row {
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, column_names }
    }

    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.column_names
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column_name))
            .and_then(|i| self.values.get(i))
    }
}

/// The engine's answer to one query: either a materialized result set or
/// the error that stopped execution, timed end to end.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub column_names: Vec<String>,
    pub column_types: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
}

impl QueryResult {
    pub fn success(column_names: Vec<String>, column_types: Vec<String>, rows: Vec<Vec<Value>>, execution_time_ms: u64) -> Self {
        let row_count = rows.len();
        Self {
            column_names,
            column_types,
            rows,
            row_count,
            execution_time_ms,
            success: true,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            column_names: vec![],
            column_types: vec![],
            rows: vec![],
            row_count: 0,
            execution_time_ms,
            success: false,
            error_message: Some(message.into()),
        }
    }
}
