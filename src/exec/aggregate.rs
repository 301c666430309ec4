//! `Aggregate`: hash aggregation keyed on `group_by`
//! expressions. Materializes groups on `open`, guarded by the shared
//! `Limiter`; output order is undefined unless a `Sort` follows.

use std::collections::HashMap;

use crate::ast::{Expr, Function, FunctionArg, SelectItem, Value};
use crate::error::{FedError, FedResult};
use crate::exec::eval::{compare, eval};
use crate::exec::limiter::Limiter;
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::row::Row;

pub struct Aggregate {
    input: Box<dyn Operator>,
    group_by: Vec<Expr>,
    projection: Vec<SelectItem>,
    limiter: Limiter,
    lifecycle: OperatorLifecycle,
    output: std::vec::IntoIter<Row>,
    warning: Option<String>,
}

impl Aggregate {
    pub fn new(input: Box<dyn Operator>, group_by: Vec<Expr>, projection: Vec<SelectItem>, limiter: Limiter) -> Self {
        Self {
            input,
            group_by,
            projection,
            limiter,
            lifecycle: OperatorLifecycle::new(),
            output: Vec::new().into_iter(),
            warning: None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

/// A group's running aggregate state, one slot per aggregate expression the
/// projection names (count/sum/avg/min/max); non-aggregate projection items
/// are evaluated once against the group's first row.
#[derive(Debug, Clone)]
enum Accumulator {
    Count(i64),
    Sum(f64),
    Avg { sum: f64, count: i64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    fn for_function(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(Accumulator::Count(0)),
            "SUM" => Some(Accumulator::Sum(0.0)),
            "AVG" => Some(Accumulator::Avg { sum: 0.0, count: 0 }),
            "MIN" => Some(Accumulator::Min(None)),
            "MAX" => Some(Accumulator::Max(None)),
            _ => None,
        }
    }

    fn accumulate(&mut self, value: Option<Value>) -> FedResult<()> {
        match self {
            Accumulator::Count(n) => {
                if value.as_ref().map(|v| !matches!(v, Value::Null)).unwrap_or(true) {
                    *n += 1;
                }
            }
            Accumulator::Sum(total) => {
                if let Some(Value::Number(n, _)) = &value {
                    *total += n.parse::<f64>().unwrap_or(0.0);
                }
            }
            Accumulator::Avg { sum, count } => {
                if let Some(Value::Number(n, _)) = &value {
                    *sum += n.parse::<f64>().unwrap_or(0.0);
                    *count += 1;
                }
            }
            Accumulator::Min(current) => {
                if let Some(v) = value {
                    if !matches!(v, Value::Null) {
                        let replace = match current {
                            None => true,
                            Some(existing) => compare(&v, existing)? == std::cmp::Ordering::Less,
                        };
                        if replace {
                            *current = Some(v);
                        }
                    }
                }
            }
            Accumulator::Max(current) => {
                if let Some(v) = value {
                    if !matches!(v, Value::Null) {
                        let replace = match current {
                            None => true,
                            Some(existing) => compare(&v, existing)? == std::cmp::Ordering::Greater,
                        };
                        if replace {
                            *current = Some(v);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        match self {
            Accumulator::Count(n) => Value::Number(n.to_string(), false),
            Accumulator::Sum(total) => Value::Number(format_number(*total), false),
            Accumulator::Avg { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Number(format_number(sum / *count as f64), false)
                }
            }
            Accumulator::Min(v) | Accumulator::Max(v) => v.clone().unwrap_or(Value::Null),
        }
    }
}

fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// If `expr` is a single-argument aggregate call, the function name and its
/// argument expression (`COUNT(*)`'s bare `*` argument evaluates to a
/// non-NULL sentinel so it always counts).
fn as_aggregate(expr: &Expr) -> Option<(&str, Option<&Expr>)> {
    match expr {
        Expr::Function(Function { name, args, distinct: _ }) => {
            let fname = name.last()?.value.as_str();
            if Accumulator::for_function(fname).is_none() {
                return None;
            }
            match args.as_slice() {
                [] => Some((fname, None)),
                [FunctionArg::Unnamed(Expr::Wildcard)] => Some((fname, None)),
                [FunctionArg::Unnamed(arg)] => Some((fname, Some(arg))),
                _ => None,
            }
        }
        _ => None,
    }
}

fn group_key(group_by: &[Expr], row: &Row) -> FedResult<Vec<Value>> {
    group_by.iter().map(|e| eval(e, row)).collect()
}

impl Operator for Aggregate {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.input.open()?;

        let mut buffered = Vec::new();
        while self.input.has_next()? {
            buffered.push(self.input.next()?);
        }
        let limited = self.limiter.limit(buffered);
        self.warning = limited.warning;

        let mut groups: HashMap<Vec<String>, (Vec<Value>, Row, Vec<Accumulator>)> = HashMap::new();
        let aggregate_specs: Vec<Option<(&str, Option<&Expr>)>> =
            self.projection.iter().map(project_expr).map(as_aggregate).collect();

        for row in &limited.rows {
            let key_values = group_key(&self.group_by, row)?;
            let key_repr: Vec<String> = key_values.iter().map(|v| format!("{v:?}")).collect();
            let entry = groups.entry(key_repr).or_insert_with(|| {
                let accs = aggregate_specs
                    .iter()
                    .map(|spec| spec.and_then(|(name, _)| Accumulator::for_function(name)))
                    .collect();
                (key_values.clone(), row.clone(), accs)
            });
            for (spec, acc) in aggregate_specs.iter().zip(entry.2.iter_mut()) {
                if let Some((_, arg)) = spec {
                    let value = match arg {
                        Some(expr) => Some(eval(expr, row)?),
                        None => Some(Value::Number("1".to_string(), false)),
                    };
                    acc.accumulate(value)?;
                }
            }
        }

        let output_columns = item_names(&self.projection);
        let mut rows = Vec::with_capacity(groups.len());
        for (_, (_, sample_row, accs)) in groups {
            let mut values = Vec::with_capacity(self.projection.len());
            for (item, acc) in self.projection.iter().zip(accs.iter()) {
                let expr = project_expr(item);
                if as_aggregate(expr).is_some() {
                    values.push(acc.finish());
                } else {
                    values.push(eval(expr, &sample_row)?);
                }
            }
            rows.push(Row::new(output_columns.clone(), values));
        }

        self.output = rows.into_iter();
        Ok(())
    }

    fn has_next(&mut self) -> FedResult<bool> {
        let has_next = self.output.as_slice().first().is_some();
        if !has_next {
            self.lifecycle.mark_drained();
        }
        Ok(has_next)
    }

    fn next(&mut self) -> FedResult<Row> {
        self.lifecycle.require_opened_for_next()?;
        self.output.next().ok_or_else(|| FedError::Plan {
            message: "Aggregate.next() called with no row available; call has_next() first".to_string(),
        })
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        self.input.close()
    }
}

fn project_expr(item: &SelectItem) -> &Expr {
    match item {
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => expr,
        SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => &Expr::Wildcard,
    }
}

fn item_names(items: &[SelectItem]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            SelectItem::ExprWithAlias { alias, .. } => alias.value.clone(),
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => ident.value.clone(),
            SelectItem::UnnamedExpr(Expr::Function(Function { name, .. })) => {
                name.last().map(|n| n.value.clone()).unwrap_or_else(|| format!("expr{i}"))
            }
            _ => format!("expr{i}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ident, ObjectName};
    use crate::exec::operator::tests_support::VecOperator;
    use crate::logging::CapturingLogger;
    use std::sync::Arc;

    fn row(dept: &str, salary: i64) -> Row {
        Row::new(
            vec!["dept".to_string(), "salary".to_string()],
            vec![Value::SingleQuotedString(dept.to_string()), Value::Number(salary.to_string(), false)],
        )
    }

    fn count_star() -> Expr {
        Expr::Function(Function {
            name: ObjectName(vec![Ident::new("COUNT")]),
            args: vec![FunctionArg::Unnamed(Expr::Wildcard)],
            distinct: false,
        })
    }

    #[test]
    fn groups_by_key_and_counts_each_group() {
        let rows = vec![row("eng", 100), row("eng", 200), row("sales", 50)];
        let group_by = vec![Expr::Identifier(Ident::new("dept"))];
        let projection = vec![
            SelectItem::UnnamedExpr(Expr::Identifier(Ident::new("dept"))),
            SelectItem::ExprWithAlias { expr: count_star(), alias: Ident::new("n") },
        ];
        let limiter = Limiter::new(100, Arc::new(CapturingLogger::new()));
        let mut agg = Aggregate::new(Box::new(VecOperator::new(rows)), group_by, projection, limiter);
        agg.open().unwrap();

        let mut counts = HashMap::new();
        while agg.has_next().unwrap() {
            let row = agg.next().unwrap();
            let dept = match &row.values[0] {
                Value::SingleQuotedString(s) => s.clone(),
                other => panic!("unexpected dept value {other:?}"),
            };
            let n = match &row.values[1] {
                Value::Number(n, _) => n.clone(),
                other => panic!("unexpected count value {other:?}"),
            };
            counts.insert(dept, n);
        }
        agg.close().unwrap();
        assert_eq!(counts.get("eng").map(String::as_str), Some("2"));
        assert_eq!(counts.get("sales").map(String::as_str), Some("1"));
    }
}
