//! Rule-based logical optimizer: rewrites the parsed AST to a
//! fixed point, capped at a maximum pass count as a loop guard. Each rule
//! is a plain `&mut Query` rewrite function rather than a
//! `Box<dyn TransformationRule>` object graph, since the AST here is the
//! thing actually being rewritten in place.

use std::collections::{HashMap, HashSet};

use crate::ast::visitor::{Visit, VisitControl};
use crate::ast::*;

/// Cardinality estimates consulted by join reorder. The
/// planner supplies this from catalog statistics.
pub trait CardinalityEstimator {
    fn estimate_rows(&self, table_name: &str) -> f64;
}

/// A flat estimator for callers with no catalog statistics handy.
pub struct UniformEstimator(pub f64);

impl CardinalityEstimator for UniformEstimator {
    fn estimate_rows(&self, _table_name: &str) -> f64 {
        self.0
    }
}

/// Applies the minimum rule set to a fixed point, capped at `max_passes`
///.
pub fn optimize(mut query: Query, estimator: &dyn CardinalityEstimator, max_passes: u32) -> Query {
    for _ in 0..max_passes {
        if !optimize_query(&mut query, estimator) {
            break;
        }
    }
    query
}

fn optimize_query(query: &mut Query, estimator: &dyn CardinalityEstimator) -> bool {
    let mut changed = false;
    if let Some(with) = &mut query.with {
        for cte in &mut with.cte_tables {
            changed |= optimize_query(&mut cte.query, estimator);
        }
    }
    changed |= optimize_set_expr(&mut query.body, estimator);
    for ob in &mut query.order_by {
        changed |= rewrite_expr(&mut ob.expr, estimator);
    }
    if let Some(limit) = &mut query.limit {
        changed |= rewrite_expr(limit, estimator);
    }
    if let Some(offset) = &mut query.offset {
        changed |= rewrite_expr(&mut offset.value, estimator);
    }
    if let Some(fetch) = &mut query.fetch {
        if let Some(q) = &mut fetch.quantity {
            changed |= rewrite_expr(q, estimator);
        }
    }
    changed |= push_down_limit(query);
    changed
}

fn optimize_set_expr(set_expr: &mut SetExpr, estimator: &dyn CardinalityEstimator) -> bool {
    match set_expr {
        SetExpr::Select(select) => optimize_select(select, estimator),
        SetExpr::Query(q) => optimize_query(q, estimator),
        SetExpr::SetOperation { left, right, .. } => {
            let a = optimize_set_expr(left, estimator);
            let b = optimize_set_expr(right, estimator);
            a || b
        }
        SetExpr::Values(values) => {
            let mut changed = false;
            for row in &mut values.0 {
                for expr in row {
                    changed |= rewrite_expr(expr, estimator);
                }
            }
            changed
        }
    }
}

fn optimize_select(select: &mut Select, estimator: &dyn CardinalityEstimator) -> bool {
    let mut changed = false;

    for item in &mut select.projection {
        match item {
            SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => {
                changed |= rewrite_expr(e, estimator);
            }
            SelectItem::QualifiedWildcard(_) | SelectItem::Wildcard => {}
        }
    }
    if let Some(selection) = &mut select.selection {
        changed |= rewrite_expr(selection, estimator);
    }
    for g in &mut select.group_by {
        changed |= rewrite_expr(g, estimator);
    }
    if let Some(having) = &mut select.having {
        changed |= rewrite_expr(having, estimator);
    }

    for twj in &mut select.from {
        changed |= optimize_table_factor(&mut twj.relation, estimator);
        for join in &mut twj.joins {
            changed |= optimize_table_factor(&mut join.relation, estimator);
            if let Some(on_expr) = join_on_expr_mut(&mut join.join_operator) {
                changed |= rewrite_expr(on_expr, estimator);
            }
        }
    }

    changed |= push_down_predicates_in_select(select);
    changed |= prune_projections_in_select(select);
    changed |= reorder_joins_in_select(select, estimator);

    changed
}

fn optimize_table_factor(factor: &mut TableFactor, estimator: &dyn CardinalityEstimator) -> bool {
    match factor {
        TableFactor::Derived { subquery, .. } => optimize_query(subquery, estimator),
        TableFactor::NestedJoin(twj) => {
            let mut changed = optimize_table_factor(&mut twj.relation, estimator);
            for join in &mut twj.joins {
                changed |= optimize_table_factor(&mut join.relation, estimator);
                if let Some(on_expr) = join_on_expr_mut(&mut join.join_operator) {
                    changed |= rewrite_expr(on_expr, estimator);
                }
            }
            changed
        }
        TableFactor::Table { .. } | TableFactor::TableFunction { .. } | TableFactor::UNNEST { .. } => false,
    }
}

fn join_on_expr_mut(op: &mut JoinOperator) -> Option<&mut Expr> {
    let constraint = match op {
        JoinOperator::Inner(c) | JoinOperator::LeftOuter(c) | JoinOperator::RightOuter(c) | JoinOperator::FullOuter(c) => c,
        JoinOperator::CrossJoin | JoinOperator::CrossApply | JoinOperator::OuterApply => return None,
    };
    match constraint {
        JoinConstraint::On(expr) => Some(expr),
        _ => None,
    }
}

/// Constant folding (`Expr::is_constant`), plus descent into
/// any subquery an expression carries (`IN`, `EXISTS`, scalar subquery),
/// since those get the same rule set applied as any other query body.
fn rewrite_expr(expr: &mut Expr, estimator: &dyn CardinalityEstimator) -> bool {
    match expr {
        Expr::BinaryOp { left, op, right } => {
            let mut changed = rewrite_expr(left, estimator);
            changed |= rewrite_expr(right, estimator);
            if let (Expr::Value(Value::Number(l, false)), Expr::Value(Value::Number(r, false))) =
                (left.as_ref(), right.as_ref())
            {
                if let (Ok(lf), Ok(rf)) = (l.parse::<f64>(), r.parse::<f64>()) {
                    let folded = match op {
                        BinaryOperator::Plus => Some(lf + rf),
                        BinaryOperator::Minus => Some(lf - rf),
                        BinaryOperator::Multiply => Some(lf * rf),
                        BinaryOperator::Divide if rf != 0.0 => Some(lf / rf),
                        _ => None,
                    };
                    if let Some(v) = folded {
                        *expr = Expr::Value(Value::Number(format_number(v), false));
                        return true;
                    }
                }
            }
            if matches!(op, BinaryOperator::And) {
                if matches!(left.as_ref(), Expr::Value(Value::Boolean(false)))
                    || matches!(right.as_ref(), Expr::Value(Value::Boolean(false)))
                {
                    *expr = Expr::Value(Value::Boolean(false));
                    return true;
                }
                if matches!(left.as_ref(), Expr::Value(Value::Boolean(true))) {
                    *expr = (**right).clone();
                    return true;
                }
                if matches!(right.as_ref(), Expr::Value(Value::Boolean(true))) {
                    *expr = (**left).clone();
                    return true;
                }
            }
            if matches!(op, BinaryOperator::Or) {
                if matches!(left.as_ref(), Expr::Value(Value::Boolean(true)))
                    || matches!(right.as_ref(), Expr::Value(Value::Boolean(true)))
                {
                    *expr = Expr::Value(Value::Boolean(true));
                    return true;
                }
                if matches!(left.as_ref(), Expr::Value(Value::Boolean(false))) {
                    *expr = (**right).clone();
                    return true;
                }
                if matches!(right.as_ref(), Expr::Value(Value::Boolean(false))) {
                    *expr = (**left).clone();
                    return true;
                }
            }
            changed
        }
        Expr::UnaryOp { op, expr: inner } => {
            let changed = rewrite_expr(inner, estimator);
            if matches!(op, UnaryOperator::Minus) {
                if let Expr::Value(Value::Number(n, false)) = inner.as_ref() {
                    if let Ok(v) = n.parse::<f64>() {
                        *expr = Expr::Value(Value::Number(format_number(-v), false));
                        return true;
                    }
                }
            }
            changed
        }
        Expr::Nested(inner) => {
            let changed = rewrite_expr(inner, estimator);
            if matches!(inner.as_ref(), Expr::Value(_)) {
                *expr = (**inner).clone();
                return true;
            }
            changed
        }
        Expr::Cast { expr: inner, .. } | Expr::IsNull(inner) | Expr::IsNotNull(inner) => rewrite_expr(inner, estimator),
        Expr::Between { expr: e, low, high, .. } => {
            let mut changed = rewrite_expr(e, estimator);
            changed |= rewrite_expr(low, estimator);
            changed |= rewrite_expr(high, estimator);
            changed
        }
        Expr::InList { expr: e, list, .. } => {
            let mut changed = rewrite_expr(e, estimator);
            for item in list {
                changed |= rewrite_expr(item, estimator);
            }
            changed
        }
        Expr::InSubquery { expr: e, subquery, .. } => {
            let mut changed = rewrite_expr(e, estimator);
            changed |= optimize_query(subquery, estimator);
            changed
        }
        Expr::Subquery(subquery) => optimize_query(subquery, estimator),
        Expr::Exists { subquery, .. } => optimize_query(subquery, estimator),
        Expr::Function(func) => {
            let mut changed = false;
            for arg in &mut func.args {
                match arg {
                    FunctionArg::Unnamed(e) => changed |= rewrite_expr(e, estimator),
                    FunctionArg::Named { arg, .. } => changed |= rewrite_expr(arg, estimator),
                }
            }
            changed
        }
        Expr::Case { operand, conditions, results, else_result } => {
            let mut changed = false;
            if let Some(o) = operand {
                changed |= rewrite_expr(o, estimator);
            }
            for c in conditions {
                changed |= rewrite_expr(c, estimator);
            }
            for r in results {
                changed |= rewrite_expr(r, estimator);
            }
            if let Some(e) = else_result {
                changed |= rewrite_expr(e, estimator);
            }
            changed
        }
        Expr::Trim { expr: e, trim_what, .. } => {
            let mut changed = rewrite_expr(e, estimator);
            if let Some(w) = trim_what {
                changed |= rewrite_expr(w, estimator);
            }
            changed
        }
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) | Expr::Value(_) | Expr::Wildcard | Expr::QualifiedWildcard(_) => false,
    }
}

fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn table_factor_name(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, alias, .. } => Some(
            alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .unwrap_or_else(|| name.last().map(|i| i.value.clone()).unwrap_or_default()),
        ),
        TableFactor::Derived { alias, .. } => alias.as_ref().map(|a| a.name.value.clone()),
        _ => None,
    }
}

struct QualifierCollector {
    qualifiers: HashSet<String>,
    has_unqualified: bool,
}

impl Visit for QualifierCollector {
    fn enter(&mut self, expr: &Expr) -> VisitControl {
        match expr {
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                self.qualifiers.insert(parts[0].value.clone());
            }
            Expr::Identifier(_) => self.has_unqualified = true,
            _ => {}
        }
        VisitControl::Continue
    }
}

fn collect_qualifiers(expr: &Expr) -> (HashSet<String>, bool) {
    let mut collector = QualifierCollector { qualifiers: HashSet::new(), has_unqualified: false };
    crate::ast::visitor::walk_expr(&mut collector, expr);
    (collector.qualifiers, collector.has_unqualified)
}

fn and(a: Expr, b: Expr) -> Expr {
    Expr::BinaryOp { left: Box::new(a), op: BinaryOperator::And, right: Box::new(b) }
}

fn split_conjuncts(expr: Expr) -> Vec<Expr> {
    match expr {
        Expr::BinaryOp { left, op, right } if op.is_conjunction() => {
            let mut out = split_conjuncts(*left);
            out.extend(split_conjuncts(*right));
            out
        }
        other => vec![other],
    }
}

fn combine_conjuncts(mut exprs: Vec<Expr>) -> Option<Expr> {
    if exprs.is_empty() {
        return None;
    }
    let first = exprs.remove(0);
    Some(exprs.into_iter().fold(first, and))
}

fn strip_qualifier(expr: &mut Expr, qualifier: &str) {
    match expr {
        Expr::CompoundIdentifier(parts) => {
            if parts.len() >= 2 && parts[0].value.eq_ignore_ascii_case(qualifier) {
                let rest = parts.split_off(1);
                *expr = if rest.len() == 1 {
                    Expr::Identifier(rest.into_iter().next().expect("len checked"))
                } else {
                    Expr::CompoundIdentifier(rest)
                };
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            strip_qualifier(left, qualifier);
            strip_qualifier(right, qualifier);
        }
        Expr::UnaryOp { expr: inner, .. }
        | Expr::Nested(inner)
        | Expr::IsNull(inner)
        | Expr::IsNotNull(inner)
        | Expr::Cast { expr: inner, .. } => strip_qualifier(inner, qualifier),
        Expr::Function(func) => {
            for arg in &mut func.args {
                match arg {
                    FunctionArg::Unnamed(e) => strip_qualifier(e, qualifier),
                    FunctionArg::Named { arg, .. } => strip_qualifier(arg, qualifier),
                }
            }
        }
        Expr::Case { operand, conditions, results, else_result } => {
            if let Some(o) = operand {
                strip_qualifier(o, qualifier);
            }
            for c in conditions {
                strip_qualifier(c, qualifier);
            }
            for r in results {
                strip_qualifier(r, qualifier);
            }
            if let Some(e) = else_result {
                strip_qualifier(e, qualifier);
            }
        }
        Expr::Between { expr: e, low, high, .. } => {
            strip_qualifier(e, qualifier);
            strip_qualifier(low, qualifier);
            strip_qualifier(high, qualifier);
        }
        Expr::InList { expr: e, list, .. } => {
            strip_qualifier(e, qualifier);
            for item in list {
                strip_qualifier(item, qualifier);
            }
        }
        Expr::InSubquery { expr: e, .. } => strip_qualifier(e, qualifier),
        Expr::Trim { expr: e, trim_what, .. } => {
            strip_qualifier(e, qualifier);
            if let Some(w) = trim_what {
                strip_qualifier(w, qualifier);
            }
        }
        Expr::Identifier(_)
        | Expr::Value(_)
        | Expr::Wildcard
        | Expr::QualifiedWildcard(_)
        | Expr::Subquery(_)
        | Expr::Exists { .. } => {}
    }
}

/// Predicate push-down: splits the `WHERE` clause into
/// conjuncts and, for each conjunct that references columns from exactly
/// one table/alias, moves it either into that inner join's `ON` clause or
/// (when the referenced relation is a derived sub-query) into the
/// sub-query's own `WHERE`. Conjuncts that reference more than one table,
/// or an unqualified column, stay at the outer level untouched.
fn push_down_predicates_in_select(select: &mut Select) -> bool {
    if select.from.len() != 1 || select.selection.is_none() {
        return false;
    }
    let conjuncts = split_conjuncts(select.selection.take().expect("checked is_some"));
    let mut remaining = Vec::new();
    let mut changed = false;

    for conjunct in conjuncts {
        let (qualifiers, has_unqualified) = collect_qualifiers(&conjunct);
        if has_unqualified || qualifiers.len() != 1 {
            remaining.push(conjunct);
            continue;
        }
        let target = qualifiers.into_iter().next().expect("len checked");
        let twj = &mut select.from[0];

        if table_factor_name(&twj.relation).as_deref() == Some(target.as_str()) {
            if let TableFactor::Derived { subquery, .. } = &mut twj.relation {
                if let SetExpr::Select(inner) = subquery.body.as_mut() {
                    let mut stripped = conjunct.clone();
                    strip_qualifier(&mut stripped, &target);
                    inner.selection = Some(match inner.selection.take() {
                        Some(existing) => and(existing, stripped),
                        None => stripped,
                    });
                    changed = true;
                    continue;
                }
            }
            remaining.push(conjunct);
            continue;
        }

        let mut pushed = false;
        for join in &mut twj.joins {
            if table_factor_name(&join.relation).as_deref() != Some(target.as_str()) {
                continue;
            }
            // Only an inner join's ON clause is safe to absorb a WHERE conjunct into:
            // folding it into an outer join's ON would preserve rows the WHERE would
            // otherwise have filtered out (the outer side's NULL-extended rows).
            if let Some(constraint) = inner_join_constraint_mut(&mut join.join_operator) {
                match constraint {
                    JoinConstraint::On(existing) => {
                        let old = std::mem::replace(existing, Expr::Value(Value::Null));
                        *existing = and(old, conjunct.clone());
                    }
                    _ => *constraint = JoinConstraint::On(conjunct.clone()),
                }
                pushed = true;
            }
            break;
        }
        if pushed {
            changed = true;
        } else {
            remaining.push(conjunct);
        }
    }

    select.selection = combine_conjuncts(remaining);
    changed
}

fn inner_join_constraint_mut(op: &mut JoinOperator) -> Option<&mut JoinConstraint> {
    match op {
        JoinOperator::Inner(c) => Some(c),
        JoinOperator::LeftOuter(_)
        | JoinOperator::RightOuter(_)
        | JoinOperator::FullOuter(_)
        | JoinOperator::CrossJoin
        | JoinOperator::CrossApply
        | JoinOperator::OuterApply => None,
    }
}

struct AliasRefCollector {
    referenced: HashMap<String, HashSet<String>>,
    bail: bool,
}

impl Visit for AliasRefCollector {
    fn enter(&mut self, expr: &Expr) -> VisitControl {
        match expr {
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                self.referenced
                    .entry(parts[0].value.clone())
                    .or_default()
                    .insert(parts.last().expect("len checked").value.clone());
            }
            Expr::Identifier(_) | Expr::Wildcard | Expr::QualifiedWildcard(_) => self.bail = true,
            _ => {}
        }
        VisitControl::Continue
    }
}

/// Projection pruning: trims a derived sub-query's
/// pass-through column list down to whatever the enclosing `Select`
/// actually references, when that's knowable without a catalog (no
/// wildcard or unqualified reference anywhere in the enclosing query).
fn prune_projections_in_select(select: &mut Select) -> bool {
    let mut collector = AliasRefCollector { referenced: HashMap::new(), bail: false };
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => {
                crate::ast::visitor::walk_expr(&mut collector, e);
            }
            SelectItem::QualifiedWildcard(_) | SelectItem::Wildcard => collector.bail = true,
        }
    }
    if let Some(selection) = &select.selection {
        crate::ast::visitor::walk_expr(&mut collector, selection);
    }
    for g in &select.group_by {
        crate::ast::visitor::walk_expr(&mut collector, g);
    }
    if let Some(having) = &select.having {
        crate::ast::visitor::walk_expr(&mut collector, having);
    }
    for twj in &select.from {
        for join in &twj.joins {
            if let JoinOperator::Inner(JoinConstraint::On(e))
            | JoinOperator::LeftOuter(JoinConstraint::On(e))
            | JoinOperator::RightOuter(JoinConstraint::On(e))
            | JoinOperator::FullOuter(JoinConstraint::On(e)) = &join.join_operator
            {
                crate::ast::visitor::walk_expr(&mut collector, e);
            }
        }
    }
    if collector.bail {
        return false;
    }

    let mut changed = false;
    for twj in &mut select.from {
        if let Some(alias) = table_factor_name(&twj.relation) {
            if let Some(referenced) = collector.referenced.get(&alias) {
                if let TableFactor::Derived { subquery, .. } = &mut twj.relation {
                    changed |= prune_subquery_projection(subquery, referenced);
                }
            }
        }
        for join in &mut twj.joins {
            if let Some(alias) = table_factor_name(&join.relation) {
                if let Some(referenced) = collector.referenced.get(&alias) {
                    if let TableFactor::Derived { subquery, .. } = &mut join.relation {
                        changed |= prune_subquery_projection(subquery, referenced);
                    }
                }
            }
        }
    }
    changed
}

fn prune_subquery_projection(subquery: &mut Query, referenced: &HashSet<String>) -> bool {
    let inner = match subquery.body.as_mut() {
        SetExpr::Select(inner) if !inner.distinct => inner,
        _ => return false,
    };
    let prunable = inner.projection.iter().all(|item| {
        matches!(
            item,
            SelectItem::UnnamedExpr(Expr::Identifier(_)) | SelectItem::ExprWithAlias { expr: Expr::Identifier(_), .. }
        )
    });
    if !prunable || referenced.is_empty() {
        return false;
    }
    let kept: Vec<SelectItem> = inner
        .projection
        .iter()
        .filter(|item| {
            let name = match item {
                SelectItem::UnnamedExpr(Expr::Identifier(ident)) => &ident.value,
                SelectItem::ExprWithAlias { alias, .. } => &alias.value,
                _ => unreachable!("prunable checked above"),
            };
            referenced.contains(name)
        })
        .cloned()
        .collect();
    if kept.is_empty() || kept.len() == inner.projection.len() {
        return false;
    }
    inner.projection = kept;
    true
}

/// Limit push-down: an outer `SELECT * FROM (subquery)` with
/// no `WHERE`/`GROUP BY`/`HAVING`/`ORDER BY` of its own is a pure
/// pass-through, so its `LIMIT` can be copied into the sub-query (bounding
/// the work it does) without changing which rows the outer query returns.
fn push_down_limit(query: &mut Query) -> bool {
    let Some(outer_limit) = query.limit.clone() else { return false };
    if !query.order_by.is_empty() {
        return false;
    }
    let SetExpr::Select(select) = query.body.as_mut() else { return false };
    if select.distinct
        || select.selection.is_some()
        || !select.group_by.is_empty()
        || select.having.is_some()
        || select.from.len() != 1
        || !select.from[0].joins.is_empty()
    {
        return false;
    }
    let TableFactor::Derived { subquery, .. } = &mut select.from[0].relation else { return false };
    if subquery.limit.is_some() || !subquery.order_by.is_empty() {
        return false;
    }
    subquery.limit = Some(outer_limit);
    true
}

/// Heuristic left-deep join reorder: sorts a chain of inner
/// joins off a single base relation by ascending estimated cardinality,
/// but only when every join's `ON` clause references at most the base
/// relation and its own relation (otherwise reordering could change which
/// rows survive, so the rule leaves the chain untouched).
fn reorder_joins_in_select(select: &mut Select, estimator: &dyn CardinalityEstimator) -> bool {
    if select.from.len() != 1 {
        return false;
    }
    let twj = &mut select.from[0];
    if twj.joins.len() < 2 {
        return false;
    }
    if !twj.joins.iter().all(|j| matches!(j.join_operator, JoinOperator::Inner(_))) {
        return false;
    }
    let Some(base_name) = table_factor_name(&twj.relation) else { return false };
    let mut names = Vec::with_capacity(twj.joins.len());
    for join in &twj.joins {
        match table_factor_name(&join.relation) {
            Some(n) => names.push(n),
            None => return false,
        }
    }
    for (i, join) in twj.joins.iter().enumerate() {
        if let JoinOperator::Inner(JoinConstraint::On(expr)) = &join.join_operator {
            let (qualifiers, has_unqualified) = collect_qualifiers(expr);
            if has_unqualified {
                return false;
            }
            let allowed: HashSet<&str> = [base_name.as_str(), names[i].as_str()].into_iter().collect();
            if !qualifiers.iter().all(|q| allowed.contains(q.as_str())) {
                return false;
            }
        }
    }

    let mut ranked: Vec<(f64, usize)> = names.iter().enumerate().map(|(i, n)| (estimator.estimate_rows(n), i)).collect();
    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let new_order: Vec<usize> = ranked.into_iter().map(|(_, i)| i).collect();
    if new_order == (0..names.len()).collect::<Vec<_>>() {
        return false;
    }

    let mut joins: Vec<Option<Join>> = std::mem::take(&mut twj.joins).into_iter().map(Some).collect();
    twj.joins = new_order
        .into_iter()
        .map(|i| joins[i].take().expect("each index used once"))
        .collect();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Dialect, DialectDisplay};

    fn ident(name: &str) -> Expr {
        Expr::Identifier(Ident::new(name))
    }

    fn compound(qualifier: &str, name: &str) -> Expr {
        Expr::CompoundIdentifier(vec![Ident::new(qualifier), Ident::new(name)])
    }

    fn number(n: i64) -> Expr {
        Expr::Value(Value::Number(n.to_string(), false))
    }

    fn base_select(from: Vec<TableWithJoins>, selection: Option<Expr>) -> Select {
        Select {
            distinct: false,
            top: None,
            projection: vec![SelectItem::Wildcard],
            into: None,
            from,
            lateral_views: vec![],
            selection,
            group_by: vec![],
            having: None,
        }
    }

    fn base_query(select: Select) -> Query {
        Query {
            with: None,
            body: Box::new(SetExpr::Select(Box::new(select))),
            order_by: vec![],
            limit: None,
            offset: None,
            fetch: None,
            lock: None,
        }
    }

    #[test]
    fn constant_folding_collapses_literal_arithmetic() {
        let mut expr = Expr::BinaryOp {
            left: Box::new(number(1)),
            op: BinaryOperator::Plus,
            right: Box::new(number(2)),
        };
        let estimator = UniformEstimator(1000.0);
        assert!(rewrite_expr(&mut expr, &estimator));
        assert_eq!(expr, number(3));
    }

    #[test]
    fn predicate_push_down_moves_single_table_conjunct_into_join_on() {
        let users = TableWithJoins {
            relation: TableFactor::Table {
                name: ObjectName::single(Ident::new("users")),
                alias: Some(TableAlias { name: Ident::new("u"), columns: vec![] }),
                args: None,
                with_hints: vec![],
            },
            joins: vec![Join {
                relation: TableFactor::Table {
                    name: ObjectName::single(Ident::new("orders")),
                    alias: Some(TableAlias { name: Ident::new("o"), columns: vec![] }),
                    args: None,
                    with_hints: vec![],
                },
                join_operator: JoinOperator::Inner(JoinConstraint::On(Expr::BinaryOp {
                    left: Box::new(compound("u", "id")),
                    op: BinaryOperator::Eq,
                    right: Box::new(compound("o", "user_id")),
                })),
            }],
        };
        let selection = Expr::BinaryOp {
            left: Box::new(compound("o", "status")),
            op: BinaryOperator::Eq,
            right: Box::new(Expr::Value(Value::SingleQuotedString("open".to_string()))),
        };
        let mut select = base_select(vec![users], Some(selection));
        assert!(push_down_predicates_in_select(&mut select));
        assert!(select.selection.is_none());
        let JoinConstraint::On(on_expr) = inner_join_constraint_mut(&mut select.from[0].joins[0].join_operator).unwrap() else {
            panic!("expected On constraint");
        };
        assert!(on_expr.sql(&Dialect::ansi()).unwrap().contains("o.status = 'open'"));
    }

    #[test]
    fn predicate_on_outer_joins_null_producing_side_stays_at_top_level() {
        let users = TableWithJoins {
            relation: TableFactor::Table {
                name: ObjectName::single(Ident::new("users")),
                alias: Some(TableAlias { name: Ident::new("u"), columns: vec![] }),
                args: None,
                with_hints: vec![],
            },
            joins: vec![Join {
                relation: TableFactor::Table {
                    name: ObjectName::single(Ident::new("orders")),
                    alias: Some(TableAlias { name: Ident::new("o"), columns: vec![] }),
                    args: None,
                    with_hints: vec![],
                },
                join_operator: JoinOperator::LeftOuter(JoinConstraint::On(Expr::BinaryOp {
                    left: Box::new(compound("u", "id")),
                    op: BinaryOperator::Eq,
                    right: Box::new(compound("o", "user_id")),
                })),
            }],
        };
        let selection = Expr::BinaryOp {
            left: Box::new(compound("o", "status")),
            op: BinaryOperator::Eq,
            right: Box::new(Expr::Value(Value::SingleQuotedString("open".to_string()))),
        };
        let mut select = base_select(vec![users], Some(selection));
        assert!(!push_down_predicates_in_select(&mut select));
        assert!(select.selection.is_some());
        let JoinOperator::LeftOuter(JoinConstraint::On(on_expr)) = &select.from[0].joins[0].join_operator else {
            panic!("expected LeftOuter/On constraint");
        };
        assert!(!on_expr.sql(&Dialect::ansi()).unwrap().contains("status"));
    }

    #[test]
    fn predicate_referencing_two_tables_stays_at_top_level() {
        let users = TableWithJoins {
            relation: TableFactor::Table {
                name: ObjectName::single(Ident::new("users")),
                alias: Some(TableAlias { name: Ident::new("u"), columns: vec![] }),
                args: None,
                with_hints: vec![],
            },
            joins: vec![Join {
                relation: TableFactor::Table {
                    name: ObjectName::single(Ident::new("orders")),
                    alias: Some(TableAlias { name: Ident::new("o"), columns: vec![] }),
                    args: None,
                    with_hints: vec![],
                },
                join_operator: JoinOperator::Inner(JoinConstraint::On(Expr::BinaryOp {
                    left: Box::new(compound("u", "id")),
                    op: BinaryOperator::Eq,
                    right: Box::new(compound("o", "user_id")),
                })),
            }],
        };
        let cross_table = Expr::BinaryOp {
            left: Box::new(compound("u", "created_at")),
            op: BinaryOperator::Lt,
            right: Box::new(compound("o", "created_at")),
        };
        let mut select = base_select(vec![users], Some(cross_table));
        assert!(!push_down_predicates_in_select(&mut select));
        assert!(select.selection.is_some());
    }

    #[test]
    fn limit_pushes_into_passthrough_derived_subquery() {
        let inner = base_query(base_select(
            vec![TableWithJoins {
                relation: TableFactor::Table {
                    name: ObjectName::single(Ident::new("t")),
                    alias: None,
                    args: None,
                    with_hints: vec![],
                },
                joins: vec![],
            }],
            None,
        ));
        let derived = TableFactor::Derived {
            lateral: false,
            subquery: Box::new(inner),
            alias: Some(TableAlias { name: Ident::new("s"), columns: vec![] }),
        };
        let mut outer = base_query(base_select(vec![TableWithJoins { relation: derived, joins: vec![] }], None));
        outer.limit = Some(number(5));
        assert!(push_down_limit(&mut outer));
        let SetExpr::Select(select) = outer.body.as_ref() else { unreachable!() };
        let TableFactor::Derived { subquery, .. } = &select.from[0].relation else { unreachable!() };
        assert_eq!(subquery.limit, Some(number(5)));
    }

    #[test]
    fn join_reorder_sorts_independent_joins_by_cardinality() {
        struct ByName;
        impl CardinalityEstimator for ByName {
            fn estimate_rows(&self, table_name: &str) -> f64 {
                match table_name {
                    "big" => 1_000_000.0,
                    "small" => 10.0,
                    _ => 100.0,
                }
            }
        }
        let twj = TableWithJoins {
            relation: TableFactor::Table {
                name: ObjectName::single(Ident::new("base")),
                alias: None,
                args: None,
                with_hints: vec![],
            },
            joins: vec![
                Join {
                    relation: TableFactor::Table {
                        name: ObjectName::single(Ident::new("big")),
                        alias: None,
                        args: None,
                        with_hints: vec![],
                    },
                    join_operator: JoinOperator::Inner(JoinConstraint::On(Expr::BinaryOp {
                        left: Box::new(compound("base", "id")),
                        op: BinaryOperator::Eq,
                        right: Box::new(compound("big", "base_id")),
                    })),
                },
                Join {
                    relation: TableFactor::Table {
                        name: ObjectName::single(Ident::new("small")),
                        alias: None,
                        args: None,
                        with_hints: vec![],
                    },
                    join_operator: JoinOperator::Inner(JoinConstraint::On(Expr::BinaryOp {
                        left: Box::new(compound("base", "id")),
                        op: BinaryOperator::Eq,
                        right: Box::new(compound("small", "base_id")),
                    })),
                },
            ],
        };
        let mut select = base_select(vec![twj], None);
        assert!(reorder_joins_in_select(&mut select, &ByName));
        assert_eq!(table_factor_name(&select.from[0].joins[0].relation).as_deref(), Some("small"));
    }
}
