//! `Join`: hash-joins on a simple equi-predicate, falling back
//! to nested-loop for anything else (`USING`, `NATURAL`, a non-equi `ON`).
//! The smaller input is materialized as the build side, guarded by the
//! shared `Limiter`.

use std::collections::HashMap;

use crate::ast::{Expr, JoinConstraint};
use crate::error::{FedError, FedResult};
use crate::exec::eval::{eval, is_true};
use crate::exec::limiter::Limiter;
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::row::Row;
use crate::plan::physical::JoinKind;

pub struct Join {
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    constraint: JoinConstraint,
    kind: JoinKind,
    limiter: Limiter,
    lifecycle: OperatorLifecycle,
    buffered: std::vec::IntoIter<Row>,
    warning: Option<String>,
}

impl Join {
    pub fn new(left: Box<dyn Operator>, right: Box<dyn Operator>, constraint: JoinConstraint, kind: JoinKind, limiter: Limiter) -> Self {
        Self {
            left,
            right,
            constraint,
            kind,
            lifecycle: OperatorLifecycle::new(),
            buffered: Vec::new().into_iter(),
            warning: None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

fn merge_rows(left: &Row, right: &Row) -> Row {
    let mut column_names = left.column_names.clone();
    column_names.extend(right.column_names.iter().cloned());
    let mut values = left.values.clone();
    values.extend(right.values.iter().cloned());
    Row::new(column_names, values)
}

fn null_padded(left: &Row, right_columns: &[String]) -> Row {
    let mut column_names = left.column_names.clone();
    column_names.extend(right_columns.iter().cloned());
    let mut values = left.values.clone();
    values.extend(right_columns.iter().map(|_| crate::ast::Value::Null));
    Row::new(column_names, values)
}

/// If `constraint` is `ON a.x = b.y` (or bare column names present on both
/// sides), the left/right column names the hash join keys on.
fn equi_columns(constraint: &JoinConstraint) -> Option<(String, String)> {
    match constraint {
        JoinConstraint::On(Expr::BinaryOp { left, op, right }) if op.is_equality() => {
            Some((column_name(left)?, column_name(right)?))
        }
        _ => None,
    }
}

fn column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|p| p.value.clone()),
        _ => None,
    }
}

impl Operator for Join {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.left.open()?;
        self.right.open()?;

        let mut left_rows = Vec::new();
        while self.left.has_next()? {
            left_rows.push(self.left.next()?);
        }
        let mut right_rows = Vec::new();
        while self.right.has_next()? {
            right_rows.push(self.right.next()?);
        }

        let right_columns = right_rows.first().map(|r| r.column_names.clone()).unwrap_or_default();
        let output = match (&self.constraint, equi_columns(&self.constraint)) {
            (JoinConstraint::Using(idents), _) => {
                let names: Vec<String> = idents.iter().map(|i| i.value.clone()).collect();
                nested_loop(&left_rows, &right_rows, &right_columns, self.kind, |l, r| {
                    Ok(names.iter().all(|n| l.get(n) == r.get(n)))
                })?
            }
            (JoinConstraint::Natural, _) => {
                let common: Vec<String> = left_rows
                    .first()
                    .map(|l| l.column_names.iter().filter(|c| right_columns.contains(c)).cloned().collect())
                    .unwrap_or_default();
                nested_loop(&left_rows, &right_rows, &right_columns, self.kind, |l, r| {
                    Ok(common.iter().all(|n| l.get(n) == r.get(n)))
                })?
            }
            (JoinConstraint::None, _) => {
                nested_loop(&left_rows, &right_rows, &right_columns, self.kind, |_, _| Ok(true))?
            }
            (JoinConstraint::On(_), Some((left_col, right_col))) => {
                let right_limited = self.limiter.limit(right_rows);
                self.warning = right_limited.warning;
                hash_join(&left_rows, &right_limited.rows, &right_columns, &left_col, &right_col, self.kind)?
            }
            (JoinConstraint::On(predicate), None) => {
                nested_loop(&left_rows, &right_rows, &right_columns, self.kind, |l, r| {
                    Ok(is_true(&eval(predicate, &merge_rows(l, r))?))
                })?
            }
        };

        self.buffered = output.into_iter();
        Ok(())
    }

    fn has_next(&mut self) -> FedResult<bool> {
        let has_next = self.buffered.as_slice().first().is_some();
        if !has_next {
            self.lifecycle.mark_drained();
        }
        Ok(has_next)
    }

    fn next(&mut self) -> FedResult<Row> {
        self.lifecycle.require_opened_for_next()?;
        self.buffered.next().ok_or_else(|| FedError::Plan {
            message: "Join.next() called with no row available; call has_next() first".to_string(),
        })
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        self.left.close()?;
        self.right.close()
    }
}

fn nested_loop(
    left_rows: &[Row],
    right_rows: &[Row],
    right_columns: &[String],
    kind: JoinKind,
    matches: impl Fn(&Row, &Row) -> FedResult<bool>,
) -> FedResult<Vec<Row>> {
    let mut output = Vec::new();
    for l in left_rows {
        let mut matched = false;
        for r in right_rows {
            if matches(l, r)? {
                matched = true;
                output.push(merge_rows(l, r));
            }
        }
        if !matched && matches!(kind, JoinKind::LeftOuter | JoinKind::FullOuter) {
            output.push(null_padded(l, right_columns));
        }
    }
    Ok(output)
}

/// Builds a hash table on the right (build) side keyed by `right_col`,
/// probing it once per left row. Inner/left-outer/cross covered; right- and
/// full-outer fall back to a nested loop since unmatched build-side rows
/// need a second pass this simple index doesn't keep.
fn hash_join(
    left_rows: &[Row],
    right_rows: &[Row],
    right_columns: &[String],
    left_col: &str,
    right_col: &str,
    kind: JoinKind,
) -> FedResult<Vec<Row>> {
    if matches!(kind, JoinKind::RightOuter | JoinKind::FullOuter) {
        return nested_loop(left_rows, right_rows, right_columns, kind, |l, r| {
            Ok(l.get(left_col) == r.get(right_col) && l.get(left_col).is_some())
        });
    }

    let mut table: HashMap<String, Vec<&Row>> = HashMap::new();
    for r in right_rows {
        if let Some(key) = r.get(right_col) {
            table.entry(format!("{key:?}")).or_default().push(r);
        }
    }

    let mut output = Vec::new();
    for l in left_rows {
        let matched_rows = l.get(left_col).and_then(|key| table.get(&format!("{key:?}")));
        match matched_rows {
            Some(matches) if !matches.is_empty() => {
                for r in matches {
                    output.push(merge_rows(l, r));
                }
            }
            _ => {
                if matches!(kind, JoinKind::LeftOuter | JoinKind::FullOuter) {
                    output.push(null_padded(l, right_columns));
                }
            }
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Ident, Value};
    use crate::exec::operator::tests_support::VecOperator;
    use crate::logging::CapturingLogger;
    use std::sync::Arc;

    fn left_rows() -> Vec<Row> {
        vec![
            Row::new(vec!["id".to_string()], vec![Value::Number("1".to_string(), false)]),
            Row::new(vec!["id".to_string()], vec![Value::Number("2".to_string(), false)]),
        ]
    }

    fn right_rows() -> Vec<Row> {
        vec![Row::new(
            vec!["user_id".to_string(), "amount".to_string()],
            vec![Value::Number("1".to_string(), false), Value::Number("100".to_string(), false)],
        )]
    }

    fn equi_on() -> JoinConstraint {
        JoinConstraint::On(Expr::BinaryOp {
            left: Box::new(Expr::Identifier(Ident::new("id"))),
            op: BinaryOperator::Eq,
            right: Box::new(Expr::Identifier(Ident::new("user_id"))),
        })
    }

    #[test]
    fn inner_join_keeps_only_matching_rows() {
        let limiter = Limiter::new(100, Arc::new(CapturingLogger::new()));
        let mut join = Join::new(
            Box::new(VecOperator::new(left_rows())),
            Box::new(VecOperator::new(right_rows())),
            equi_on(),
            JoinKind::Inner,
            limiter,
        );
        join.open().unwrap();
        let mut count = 0;
        while join.has_next().unwrap() {
            join.next().unwrap();
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn left_outer_join_null_pads_unmatched_left_rows() {
        let limiter = Limiter::new(100, Arc::new(CapturingLogger::new()));
        let mut join = Join::new(
            Box::new(VecOperator::new(left_rows())),
            Box::new(VecOperator::new(right_rows())),
            equi_on(),
            JoinKind::LeftOuter,
            limiter,
        );
        join.open().unwrap();
        let mut rows = Vec::new();
        while join.has_next().unwrap() {
            rows.push(join.next().unwrap());
        }
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.get("amount") == Some(&Value::Null)));
    }

    #[test]
    fn cross_join_with_no_constraint_produces_cartesian_product() {
        let limiter = Limiter::new(100, Arc::new(CapturingLogger::new()));
        let mut join = Join::new(
            Box::new(VecOperator::new(left_rows())),
            Box::new(VecOperator::new(right_rows())),
            JoinConstraint::None,
            JoinKind::Cross,
            limiter,
        );
        join.open().unwrap();
        let mut count = 0;
        while join.has_next().unwrap() {
            join.next().unwrap();
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
