//! `Sort`: materializes its entire input, guarded by the shared
//! `Limiter`, then emits it back out in order. `NULL` placement follows
//! `OrderByExpr::nulls_first`, defaulting to SQL's usual NULLS LAST for
//! ascending order and NULLS FIRST for descending.

use std::cmp::Ordering;

use crate::ast::{OrderByExpr, Value};
use crate::error::FedResult;
use crate::exec::eval::{compare, eval};
use crate::exec::limiter::Limiter;
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::row::Row;

pub struct Sort {
    input: Box<dyn Operator>,
    order_by: Vec<OrderByExpr>,
    limiter: Limiter,
    lifecycle: OperatorLifecycle,
    sorted: std::vec::IntoIter<Row>,
    warning: Option<String>,
}

impl Sort {
    pub fn new(input: Box<dyn Operator>, order_by: Vec<OrderByExpr>, limiter: Limiter) -> Self {
        Self { input, order_by, limiter, lifecycle: OperatorLifecycle::new(), sorted: Vec::new().into_iter(), warning: None }
    }

    /// The limiter's truncation warning, if this sort's materialization
    /// tripped the intermediate-result cap.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

impl Operator for Sort {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.input.open()?;
        let mut buffered = Vec::new();
        while self.input.has_next()? {
            buffered.push(self.input.next()?);
        }
        let limited = self.limiter.limit(buffered);
        self.warning = limited.warning;
        let mut rows = limited.rows;

        let mut sort_err = None;
        rows.sort_by(|a, b| {
            if sort_err.is_some() {
                return Ordering::Equal;
            }
            match compare_rows(a, b, &self.order_by) {
                Ok(ordering) => ordering,
                Err(e) => {
                    sort_err = Some(e);
                    Ordering::Equal
                }
            }
        });
        if let Some(e) = sort_err {
            return Err(e);
        }

        self.sorted = rows.into_iter();
        Ok(())
    }

    fn has_next(&mut self) -> FedResult<bool> {
        let has_next = self.sorted.as_slice().first().is_some();
        if !has_next {
            self.lifecycle.mark_drained();
        }
        Ok(has_next)
    }

    fn next(&mut self) -> FedResult<Row> {
        self.lifecycle.require_opened_for_next()?;
        self.sorted.next().ok_or_else(|| crate::error::FedError::Plan {
            message: "Sort.next() called with no row available; call has_next() first".to_string(),
        })
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        self.input.close()
    }
}

fn compare_rows(a: &Row, b: &Row, order_by: &[OrderByExpr]) -> FedResult<Ordering> {
    for key in order_by {
        let av = eval(&key.expr, a)?;
        let bv = eval(&key.expr, b)?;
        let ascending = key.asc.unwrap_or(true);
        let nulls_first = key.nulls_first.unwrap_or(!ascending);

        let ordering = match (matches!(av, Value::Null), matches!(bv, Value::Null)) {
            (true, true) => Ordering::Equal,
            (true, false) => if nulls_first { Ordering::Less } else { Ordering::Greater },
            (false, true) => if nulls_first { Ordering::Greater } else { Ordering::Less },
            (false, false) => {
                let cmp = compare(&av, &bv)?;
                if ascending { cmp } else { cmp.reverse() }
            }
        };
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}
