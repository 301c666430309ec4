//! Dialect converter: renders an already-parsed AST back into
//! the SQL text of a chosen target dialect, normalizing pagination into
//! whichever of MySQL/Postgres `LIMIT..OFFSET`, SQL Server/Oracle
//! `OFFSET..FETCH`, Hive `LIMIT`-only, Oracle-legacy `ROWNUM`, or ANSI
//! `FETCH FIRST` syntax the target dialect uses, plus a syntax-feature
//! detector that flags constructs the target cannot render.

use crate::ast::visitor::{Visit, VisitControl};
use crate::ast::{Expr, Query, SetExpr, TableFactor, TableWithJoins, Value};
use crate::dialect::{Dialect, DialectDisplay, DialectTag, PaginationStyle};
use crate::error::{FedError, FedResult, UnsupportedFeature};

/// Parses `sql` as the `from` dialect and re-renders it as `to`, applying
/// this module's pagination normalization.
pub fn translate(sql: &str, from: DialectTag, to: DialectTag) -> FedResult<String> {
    let from_dialect = Dialect::for_tag(from);
    let to_dialect = Dialect::for_tag(to);
    let statement = crate::parser::parse(sql, &from_dialect)?;
    render_statement(&statement, &to_dialect)
}

/// Renders `statement` for `dialect`, normalizing `Query` pagination.
/// Non-`Query` statements fall back to their own `DialectDisplay` impl,
/// which has no pagination clause to normalize.
pub fn render_statement(statement: &crate::ast::Statement, dialect: &Dialect) -> FedResult<String> {
    match statement {
        crate::ast::Statement::Query(query) => render_query(query, dialect),
        other => other.sql(dialect),
    }
}

/// Renders `query` for `dialect`, replacing whatever pagination clause the
/// source AST carries with the one `dialect.pagination` specifies.
pub fn render_query(query: &Query, dialect: &Dialect) -> FedResult<String> {
    let mut out = String::new();
    if let Some(with) = &query.with {
        out.push_str(&with.sql(dialect)?);
        out.push(' ');
    }
    out.push_str(&query.body.sql(dialect)?);
    if !query.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        out.push_str(&crate::ast::display_comma_separated(&query.order_by).sql(dialect)?);
    }

    let (count, offset) = canonical_count_and_offset(query, dialect)?;
    render_pagination(&mut out, dialect, count.as_deref(), offset.as_deref())?;

    if let Some(lock) = &query.lock {
        out.push(' ');
        out.push_str(&lock.sql(dialect)?);
    }
    Ok(out)
}

/// Extracts `(row count, offset)` from whichever of the AST's `limit` or
/// `fetch` field the source dialect populated, both rendered as SQL text in
/// the *target* dialect (so e.g. a MySQL `LIMIT 10` and an ANSI
/// `FETCH FIRST 10 ROWS ONLY` both normalize to the same `count`).
fn canonical_count_and_offset(query: &Query, dialect: &Dialect) -> FedResult<(Option<String>, Option<String>)> {
    let count = if let Some(limit) = &query.limit {
        Some(limit.sql(dialect)?)
    } else if let Some(fetch) = &query.fetch {
        match &fetch.quantity {
            Some(q) => Some(q.sql(dialect)?),
            None => None,
        }
    } else {
        None
    };
    let offset = match &query.offset {
        Some(o) => Some(o.value.sql(dialect)?),
        None => None,
    };
    Ok((count, offset))
}

fn render_pagination(
    out: &mut String,
    dialect: &Dialect,
    count: Option<&str>,
    offset: Option<&str>,
) -> FedResult<()> {
    if count.is_none() && offset.is_none() {
        return Ok(());
    }
    match dialect.pagination {
        PaginationStyle::LimitOffset => {
            if let Some(count) = count {
                out.push_str(&format!(" LIMIT {count}"));
            }
            if let Some(offset) = offset {
                out.push_str(&format!(" OFFSET {offset}"));
            }
        }
        PaginationStyle::LimitOnly => {
            let count = count.ok_or_else(|| {
                FedError::Plan { message: format!("{} pagination requires a row count", dialect.tag) }
            })?;
            out.push_str(&format!(" LIMIT {count}"));
        }
        PaginationStyle::OffsetFetch => {
            let count = count.ok_or_else(|| {
                FedError::Plan { message: format!("{} pagination requires a row count", dialect.tag) }
            })?;
            let offset = offset.unwrap_or("0");
            out.push_str(&format!(" OFFSET {offset} ROWS FETCH NEXT {count} ROWS ONLY"));
        }
        PaginationStyle::FetchFirstOnly => {
            let count = count.ok_or_else(|| {
                FedError::Plan { message: format!("{} pagination requires a row count", dialect.tag) }
            })?;
            if let Some(offset) = offset {
                out.push_str(&format!(" OFFSET {offset} ROWS FETCH FIRST {count} ROWS ONLY"));
            } else {
                out.push_str(&format!(" FETCH FIRST {count} ROWS ONLY"));
            }
        }
        PaginationStyle::RownumBetween => {
            let count = count.ok_or_else(|| {
                FedError::Plan { message: format!("{} pagination requires a row count", dialect.tag) }
            })?;
            let offset = offset.unwrap_or("0");
            let inner = std::mem::take(out);
            *out = format!(
                "SELECT * FROM (SELECT fedsql_inner.*, ROWNUM fedsql_rn FROM ({inner}) fedsql_inner) \
                 WHERE fedsql_rn BETWEEN ({offset}) + 1 AND ({offset}) + ({count})"
            );
        }
    }
    Ok(())
}

/// Walks every `Expr` inside `query` looking for constructs the target
/// dialect's feature table cannot render, e.g. `ILIKE` outside Postgres or
/// an `INTERVAL` literal in MySQL.
pub fn detect_unsupported_features(query: &Query, dialect: &Dialect) -> Vec<UnsupportedFeature> {
    let mut detector = FeatureDetector { dialect, found: Vec::new() };
    detector.walk_query(query);
    detector.found
}

struct FeatureDetector<'a> {
    dialect: &'a Dialect,
    found: Vec<UnsupportedFeature>,
}

impl<'a> FeatureDetector<'a> {
    fn walk_query(&mut self, query: &Query) {
        self.walk_set_expr(&query.body);
        for ob in &query.order_by {
            self.walk_expr(&ob.expr);
        }
        if let Some(limit) = &query.limit {
            self.walk_expr(limit);
        }
    }

    fn walk_set_expr(&mut self, set_expr: &SetExpr) {
        match set_expr {
            SetExpr::Select(select) => {
                for item in &select.projection {
                    match item {
                        crate::ast::SelectItem::UnnamedExpr(e) | crate::ast::SelectItem::ExprWithAlias { expr: e, .. } => {
                            self.walk_expr(e)
                        }
                        _ => {}
                    }
                }
                for twj in &select.from {
                    self.walk_table_with_joins(twj);
                }
                if let Some(selection) = &select.selection {
                    self.walk_expr(selection);
                }
                for expr in &select.group_by {
                    self.walk_expr(expr);
                }
                if let Some(having) = &select.having {
                    self.walk_expr(having);
                }
                if !select.lateral_views.is_empty() && !matches!(self.dialect.tag, DialectTag::Hive) {
                    self.found.push(UnsupportedFeature {
                        feature: "LATERAL VIEW".to_string(),
                        position: crate::ast::Position::default(),
                        suggestion: Some("rewrite as a join against an unnested subquery".to_string()),
                    });
                }
            }
            SetExpr::Query(q) => self.walk_query(q),
            SetExpr::SetOperation { left, right, .. } => {
                self.walk_set_expr(left);
                self.walk_set_expr(right);
            }
            SetExpr::Values(values) => {
                for row in &values.0 {
                    for expr in row {
                        self.walk_expr(expr);
                    }
                }
            }
        }
    }

    fn walk_table_with_joins(&mut self, twj: &TableWithJoins) {
        self.walk_table_factor(&twj.relation);
        for join in &twj.joins {
            self.walk_table_factor(&join.relation);
            let constraint = match &join.join_operator {
                crate::ast::JoinOperator::Inner(c)
                | crate::ast::JoinOperator::LeftOuter(c)
                | crate::ast::JoinOperator::RightOuter(c)
                | crate::ast::JoinOperator::FullOuter(c) => Some(c),
                crate::ast::JoinOperator::CrossJoin
                | crate::ast::JoinOperator::CrossApply
                | crate::ast::JoinOperator::OuterApply => None,
            };
            if let Some(crate::ast::JoinConstraint::On(expr)) = constraint {
                self.walk_expr(expr);
            }
        }
    }

    fn walk_table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Derived { lateral, subquery, .. } => {
                if *lateral && !matches!(self.dialect.tag, DialectTag::Postgresql | DialectTag::Ansi) {
                    self.found.push(UnsupportedFeature {
                        feature: "LATERAL derived table".to_string(),
                        position: crate::ast::Position::default(),
                        suggestion: None,
                    });
                }
                self.walk_query(subquery);
            }
            TableFactor::NestedJoin(twj) => self.walk_table_with_joins(twj),
            _ => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        crate::ast::visitor::walk_expr(self, expr);
    }
}

impl<'a> Visit for FeatureDetector<'a> {
    fn enter(&mut self, expr: &Expr) -> VisitControl {
        match expr {
            Expr::BinaryOp { op, .. }
                if matches!(op, crate::ast::BinaryOperator::ILike | crate::ast::BinaryOperator::NotILike)
                    && !matches!(self.dialect.tag, DialectTag::Postgresql) =>
            {
                self.found.push(UnsupportedFeature {
                    feature: "ILIKE".to_string(),
                    position: crate::ast::Position::default(),
                    suggestion: Some("use LOWER(x) LIKE LOWER(pattern) instead".to_string()),
                });
            }
            Expr::Value(Value::Interval { .. }) if matches!(self.dialect.tag, DialectTag::Mysql) => {
                self.found.push(UnsupportedFeature {
                    feature: "INTERVAL literal".to_string(),
                    position: crate::ast::Position::default(),
                    suggestion: Some("use DATE_ADD/DATE_SUB with an explicit unit".to_string()),
                });
            }
            _ => {}
        }
        VisitControl::Continue
    }
}
