//! Ordinary-trait visitor: expressions are a tagged variant matched
//! exhaustively rather than a deep class hierarchy, so the visitor is an
//! ordinary trait with one method per kind and a default `descend`.
//!
//! Used by the syntax-feature detector and the RBO rules to walk
//! expression trees without hand-rolling a traversal at each call site.

use super::Expr;

/// What a visitor wants to do after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
    Continue,
    Skip,
    Stop,
}

pub trait Visit {
    /// Called before descending into `expr`'s children.
    fn enter(&mut self, _expr: &Expr) -> VisitControl {
        VisitControl::Continue
    }

    /// Called after descending into `expr`'s children.
    fn leave(&mut self, _expr: &Expr) {}

    /// Default traversal: visits every direct child expression. Overriding
    /// this is only necessary for visitors that need custom descent order.
    fn descend(&mut self, expr: &Expr) -> VisitControl {
        walk_children(self, expr)
    }
}

/// Visits `expr` and, unless `enter` returns `Skip`/`Stop`, its children.
pub fn walk_expr<V: Visit + ?Sized>(visitor: &mut V, expr: &Expr) -> VisitControl {
    match visitor.enter(expr) {
        VisitControl::Stop => return VisitControl::Stop,
        VisitControl::Skip => return VisitControl::Continue,
        VisitControl::Continue => {}
    }
    let control = visitor.descend(expr);
    visitor.leave(expr);
    control
}

fn walk_children<V: Visit + ?Sized>(visitor: &mut V, expr: &Expr) -> VisitControl {
    let children: Vec<&Expr> = match expr {
        Expr::Identifier(_)
        | Expr::CompoundIdentifier(_)
        | Expr::Value(_)
        | Expr::Wildcard
        | Expr::QualifiedWildcard(_)
        | Expr::Subquery(_)
        | Expr::Exists { .. } => vec![],
        Expr::BinaryOp { left, right, .. } => vec![left, right],
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr)
        | Expr::Cast { expr, .. } => vec![expr],
        Expr::Function(func) => func
            .args
            .iter()
            .map(|arg| match arg {
                super::FunctionArg::Unnamed(e) => e,
                super::FunctionArg::Named { arg, .. } => arg,
            })
            .collect(),
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => {
            let mut v: Vec<&Expr> = Vec::new();
            v.extend(operand.as_deref());
            v.extend(conditions.iter());
            v.extend(results.iter());
            v.extend(else_result.as_deref());
            v
        }
        Expr::Between { expr, low, high, .. } => vec![expr, low, high],
        Expr::InList { expr, list, .. } => {
            let mut v = vec![expr.as_ref()];
            v.extend(list.iter());
            v
        }
        Expr::InSubquery { expr, .. } => vec![expr],
        Expr::Trim { expr, trim_what, .. } => {
            let mut v = vec![expr.as_ref()];
            v.extend(trim_what.as_deref());
            v
        }
    };
    for child in children {
        if walk_expr(visitor, child) == VisitControl::Stop {
            return VisitControl::Stop;
        }
    }
    VisitControl::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Ident, Value};

    struct CountIdents(usize);
    impl Visit for CountIdents {
        fn enter(&mut self, expr: &Expr) -> VisitControl {
            if matches!(expr, Expr::Identifier(_)) {
                self.0 += 1;
            }
            VisitControl::Continue
        }
    }

    #[test]
    fn walk_visits_every_identifier() {
        let expr = Expr::BinaryOp {
            left: Box::new(Expr::Identifier(Ident::new("a"))),
            op: BinaryOperator::And,
            right: Box::new(Expr::BinaryOp {
                left: Box::new(Expr::Identifier(Ident::new("b"))),
                op: BinaryOperator::Eq,
                right: Box::new(Expr::Value(Value::Number("1".into(), false))),
            }),
        };
        let mut visitor = CountIdents(0);
        walk_expr(&mut visitor, &expr);
        assert_eq!(visitor.0, 2);
    }

    struct StopAtFirst;
    impl Visit for StopAtFirst {
        fn enter(&mut self, expr: &Expr) -> VisitControl {
            if matches!(expr, Expr::Identifier(_)) {
                VisitControl::Stop
            } else {
                VisitControl::Continue
            }
        }
    }

    #[test]
    fn stop_short_circuits_traversal() {
        let expr = Expr::BinaryOp {
            left: Box::new(Expr::Identifier(Ident::new("a"))),
            op: BinaryOperator::And,
            right: Box::new(Expr::Identifier(Ident::new("b"))),
        };
        assert_eq!(walk_expr(&mut StopAtFirst, &expr), VisitControl::Stop);
    }
}
