//! `Project`: evaluates a list of `SelectItem`s against each
//! child row, naming output columns from explicit aliases, bare identifiers,
//! or a dialect-neutral `exprN` fallback for computed expressions.

use crate::ast::{Expr, SelectItem};
use crate::error::FedResult;
use crate::exec::eval::eval;
use crate::exec::operator::{Operator, OperatorLifecycle};
use crate::exec::row::Row;

pub struct Project {
    input: Box<dyn Operator>,
    items: Vec<SelectItem>,
    output_names: Vec<String>,
    lifecycle: OperatorLifecycle,
}

impl Project {
    pub fn new(input: Box<dyn Operator>, items: Vec<SelectItem>) -> Self {
        let output_names = item_names(&items);
        Self { input, items, output_names, lifecycle: OperatorLifecycle::new() }
    }
}

fn item_names(items: &[SelectItem]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            SelectItem::ExprWithAlias { alias, .. } => alias.value.clone(),
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => ident.value.clone(),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(parts)) => {
                parts.last().map(|p| p.value.clone()).unwrap_or_else(|| format!("expr{i}"))
            }
            _ => format!("expr{i}"),
        })
        .collect()
}

impl Operator for Project {
    fn open(&mut self) -> FedResult<()> {
        self.lifecycle.mark_opened()?;
        self.input.open()
    }

    fn has_next(&mut self) -> FedResult<bool> {
        let has_next = self.input.has_next()?;
        if !has_next {
            self.lifecycle.mark_drained();
        }
        Ok(has_next)
    }

    fn next(&mut self) -> FedResult<Row> {
        self.lifecycle.require_opened_for_next()?;
        let input_row = self.input.next()?;
        let mut values = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    values.push(eval(expr, &input_row)?);
                }
                SelectItem::Wildcard => values.extend(input_row.values.iter().cloned()),
                SelectItem::QualifiedWildcard(_) => values.extend(input_row.values.iter().cloned()),
            }
        }
        let column_names = if values.len() == self.output_names.len() {
            self.output_names.clone()
        } else {
            input_row.column_names.clone()
        };
        Ok(Row::new(column_names, values))
    }

    fn close(&mut self) -> FedResult<()> {
        self.lifecycle.mark_closed();
        self.input.close()
    }
}
