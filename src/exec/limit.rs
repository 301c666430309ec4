//! `Limit`: skips `offset` rows then emits up to `limit`,
//! evaluating both against constant expressions once at `open` time.

use crate::ast::{Expr, Offset, Value};
use crate::error::{FedError, FedResult};
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::row::Row;

pub struct Limit {
    input: Box<dyn Operator>,
    limit: Option<Expr>,
    offset: Option<Offset>,
    lifecycle: OperatorLifecycle,
    remaining: Option<u64>,
    pending: Option<Row>,
}

impl Limit {
    pub fn new(input: Box<dyn Operator>, limit: Option<Expr>, offset: Option<Offset>) -> Self {
        Self { input, limit, offset, lifecycle: OperatorLifecycle::new(), remaining: None, pending: None }
    }
}

fn expr_as_u64(expr: &Expr) -> FedResult<u64> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n
            .parse::<u64>()
            .map_err(|_| FedError::Plan { message: format!("LIMIT/OFFSET value '{n}' is not a non-negative integer") }),
        other => Err(FedError::Plan { message: format!("LIMIT/OFFSET must be a literal integer, got {other:?}") }),
    }
}

impl Operator for Limit {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.input.open()?;

        let offset = match &self.offset {
            Some(offset) => expr_as_u64(&offset.value)?,
            None => 0,
        };
        for _ in 0..offset {
            if !self.input.has_next()? {
                break;
            }
            self.input.next()?;
        }

        self.remaining = match &self.limit {
            Some(expr) => Some(expr_as_u64(expr)?),
            None => None,
        };
        self.advance()
    }

    fn has_next(&mut self) -> FedResult<bool> {
        if self.pending.is_none() {
            self.lifecycle.mark_drained();
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> FedResult<Row> {
        self.lifecycle.require_opened_for_next()?;
        let row = self.pending.take().ok_or_else(|| FedError::Plan {
            message: "Limit.next() called with no row available; call has_next() first".to_string(),
        })?;
        self.advance()?;
        Ok(row)
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        self.input.close()
    }
}

impl Limit {
    fn advance(&mut self) -> FedResult<()> {
        if let Some(0) = self.remaining {
            self.pending = None;
            return Ok(());
        }
        if self.input.has_next()? {
            self.pending = Some(self.input.next()?);
            if let Some(remaining) = &mut self.remaining {
                *remaining -= 1;
            }
        } else {
            self.pending = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::operator::tests_support::VecOperator;

    fn row(n: i64) -> Row {
        Row::new(vec!["n".to_string()], vec![Value::Number(n.to_string(), false)])
    }

    #[test]
    fn limit_caps_output_rows() {
        let rows: Vec<Row> = (0..10).map(row).collect();
        let mut limit = Limit::new(Box::new(VecOperator::new(rows)), Some(Expr::Value(Value::Number("3".to_string(), false))), None);
        limit.open().unwrap();
        let mut seen = 0;
        while limit.has_next().unwrap() {
            limit.next().unwrap();
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn offset_skips_leading_rows() {
        let rows: Vec<Row> = (0..5).map(row).collect();
        let offset = Offset { value: Expr::Value(Value::Number("2".to_string(), false)), rows: crate::ast::OffsetRows::None };
        let mut limit = Limit::new(Box::new(VecOperator::new(rows)), None, Some(offset));
        limit.open().unwrap();
        let first = limit.next().unwrap();
        assert_eq!(first, row(2));
    }

    #[test]
    fn zero_limit_produces_no_rows() {
        let rows: Vec<Row> = (0..5).map(row).collect();
        let mut limit = Limit::new(Box::new(VecOperator::new(rows)), Some(Expr::Value(Value::Number("0".to_string(), false))), None);
        limit.open().unwrap();
        assert!(!limit.has_next().unwrap());
    }
}
