//! `Filter`: evaluates a predicate per row, pulling from its
//! child until a row satisfies it or the child is exhausted. SQL three-valued
//! logic applies — a `NULL` predicate result does not emit the row.

use crate::ast::Expr;
use crate::error::FedResult;
use crate::exec::eval::{eval, is_true};
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::row::Row;

pub struct Filter {
    input: Box<dyn Operator>,
    predicate: Expr,
    lifecycle: OperatorLifecycle,
    pending: Option<Row>,
}

impl Filter {
    pub fn new(input: Box<dyn Operator>, predicate: Expr) -> Self {
        Self { input, predicate, lifecycle: OperatorLifecycle::new(), pending: None }
    }

    fn advance(&mut self) -> FedResult<()> {
        while self.input.has_next()? {
            let row = self.input.next()?;
            if is_true(&eval(&self.predicate, &row)?) {
                self.pending = Some(row);
                return Ok(());
            }
        }
        self.pending = None;
        Ok(())
    }
}

impl Operator for Filter {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.input.open()?;
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
        let row = self.pending.take().ok_or_else(|| crate::error::FedError::Plan {
            message: "Filter.next() called with no row available; call has_next() first".to_string(),
        })?;
        self.advance()?;
        Ok(row)
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Ident, Value};
    use crate::exec::operator::tests_support::VecOperator;

    #[test]
    fn keeps_only_rows_matching_predicate() {
        let columns = vec!["age".to_string()];
        let rows = vec![
            Row::new(columns.clone(), vec![Value::Number("10".to_string(), false)]),
            Row::new(columns.clone(), vec![Value::Number("20".to_string(), false)]),
            Row::new(columns.clone(), vec![Value::Number("30".to_string(), false)]),
        ];
        let predicate = Expr::BinaryOp {
            left: Box::new(Expr::Identifier(Ident::new("age"))),
            op: BinaryOperator::Gt,
            right: Box::new(Expr::Value(Value::Number("15".to_string(), false))),
        };
        let mut filter = Filter::new(Box::new(VecOperator::new(rows)), predicate);
        filter.open().unwrap();
        let mut seen = Vec::new();
        while filter.has_next().unwrap() {
            seen.push(filter.next().unwrap());
        }
        filter.close().unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn null_predicate_result_excludes_the_row() {
        let columns = vec!["x".to_string()];
        let rows = vec![Row::new(columns.clone(), vec![Value::Null])];
        let predicate = Expr::BinaryOp {
            left: Box::new(Expr::Identifier(Ident::new("x"))),
            op: BinaryOperator::Eq,
            right: Box::new(Expr::Value(Value::Null)),
        };
        let mut filter = Filter::new(Box::new(VecOperator::new(rows)), predicate);
        filter.open().unwrap();
        assert!(!filter.has_next().unwrap());
    }
}
