use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, DialectDisplay};
use crate::error::FedError;

use super::{display_comma_separated, Ident, ObjectName, Query, TrimWhereField, Value};

/// A scalar SQL expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Expr {
    Identifier(Ident),
    CompoundIdentifier(Vec<Ident>),
    Value(Value),
    Wildcard,
    QualifiedWildcard(ObjectName),
    BinaryOp {
        left: Box<Expr>,
        op: super::BinaryOperator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: super::UnaryOperator,
        expr: Box<Expr>,
    },
    Function(Function),
    Case {
        operand: Option<Box<Expr>>,
        conditions: Vec<Expr>,
        results: Vec<Expr>,
        else_result: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: String,
    },
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    /// A parenthesized expression, kept distinct from its inner expression
    /// so the unparser can preserve the author's grouping on round-trip.
    Nested(Box<Expr>),
    Subquery(Box<Query>),
    Exists {
        subquery: Box<Query>,
        negated: bool,
    },
    Trim {
        expr: Box<Expr>,
        trim_where: Option<TrimWhereField>,
        trim_what: Option<Box<Expr>>,
    },
}

impl Expr {
    /// Every column/table reference this expression touches, by its
    /// rightmost (unqualified) name component. Used by predicate push-down
    /// to test which side's columns contain all predicate references.
    pub fn referenced_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        match self {
            Expr::Identifier(ident) => out.push(ident.value.clone()),
            Expr::CompoundIdentifier(parts) => {
                if let Some(last) = parts.last() {
                    out.push(last.value.clone());
                }
            }
            Expr::Value(_) | Expr::Wildcard | Expr::QualifiedWildcard(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_names(out);
                right.collect_names(out);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::Cast { expr, .. } => expr.collect_names(out),
            Expr::Function(func) => {
                for arg in &func.args {
                    match arg {
                        FunctionArg::Unnamed(e) => e.collect_names(out),
                        FunctionArg::Named { arg, .. } => arg.collect_names(out),
                    }
                }
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(o) = operand {
                    o.collect_names(out);
                }
                for c in conditions {
                    c.collect_names(out);
                }
                for r in results {
                    r.collect_names(out);
                }
                if let Some(e) = else_result {
                    e.collect_names(out);
                }
            }
            Expr::Between { expr, low, high, .. } => {
                expr.collect_names(out);
                low.collect_names(out);
                high.collect_names(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_names(out);
                for item in list {
                    item.collect_names(out);
                }
            }
            Expr::InSubquery { expr, .. } => expr.collect_names(out),
            Expr::Subquery(_) | Expr::Exists { .. } => {}
            Expr::Trim { expr, trim_what, .. } => {
                expr.collect_names(out);
                if let Some(w) = trim_what {
                    w.collect_names(out);
                }
            }
        }
    }

    /// `true` for literal-only expressions (used by constant folding).
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Value(_) => true,
            Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => expr.is_constant(),
            Expr::BinaryOp { left, right, .. } => left.is_constant() && right.is_constant(),
            _ => false,
        }
    }
}

impl DialectDisplay for Expr {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        match self {
            Expr::Identifier(ident) => write!(f, "{}", ident.sql(dialect)?)?,
            Expr::CompoundIdentifier(parts) => {
                write!(f, "{}", display_comma_separated_dot(parts, dialect)?)?
            }
            Expr::Value(v) => write!(f, "{}", v.sql(dialect)?)?,
            Expr::Wildcard => write!(f, "*")?,
            Expr::QualifiedWildcard(name) => write!(f, "{}.*", name.sql(dialect)?)?,
            Expr::BinaryOp { left, op, right } => {
                write!(f, "{} {} {}", left.sql(dialect)?, op.sql(dialect)?, right.sql(dialect)?)?
            }
            Expr::UnaryOp { op, expr } => {
                if matches!(op, super::UnaryOperator::Not) {
                    write!(f, "{} {}", op.sql(dialect)?, expr.sql(dialect)?)?
                } else {
                    write!(f, "{}{}", op.sql(dialect)?, expr.sql(dialect)?)?
                }
            }
            Expr::Function(func) => write!(f, "{}", func.sql(dialect)?)?,
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                write!(f, "CASE")?;
                if let Some(o) = operand {
                    write!(f, " {}", o.sql(dialect)?)?;
                }
                for (cond, res) in conditions.iter().zip(results.iter()) {
                    write!(f, " WHEN {} THEN {}", cond.sql(dialect)?, res.sql(dialect)?)?;
                }
                if let Some(e) = else_result {
                    write!(f, " ELSE {}", e.sql(dialect)?)?;
                }
                write!(f, " END")?;
            }
            Expr::Cast { expr, data_type } => write!(f, "CAST({} AS {})", expr.sql(dialect)?, data_type)?,
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr.sql(dialect)?,
                if *negated { "NOT " } else { "" },
                low.sql(dialect)?,
                high.sql(dialect)?
            )?,
            Expr::InList { expr, list, negated } => write!(
                f,
                "{} {}IN ({})",
                expr.sql(dialect)?,
                if *negated { "NOT " } else { "" },
                display_comma_separated(list).sql(dialect)?
            )?,
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => write!(
                f,
                "{} {}IN ({})",
                expr.sql(dialect)?,
                if *negated { "NOT " } else { "" },
                subquery.sql(dialect)?
            )?,
            Expr::IsNull(expr) => write!(f, "{} IS NULL", expr.sql(dialect)?)?,
            Expr::IsNotNull(expr) => write!(f, "{} IS NOT NULL", expr.sql(dialect)?)?,
            Expr::Nested(expr) => write!(f, "({})", expr.sql(dialect)?)?,
            Expr::Subquery(query) => write!(f, "({})", query.sql(dialect)?)?,
            Expr::Exists { subquery, negated } => write!(
                f,
                "{}EXISTS ({})",
                if *negated { "NOT " } else { "" },
                subquery.sql(dialect)?
            )?,
            Expr::Trim {
                expr,
                trim_where,
                trim_what,
            } => {
                write!(f, "TRIM(")?;
                if let Some(w) = trim_where {
                    write!(f, "{} ", w.sql(dialect)?)?;
                }
                if let Some(what) = trim_what {
                    write!(f, "{} ", what.sql(dialect)?)?;
                }
                if trim_where.is_some() || trim_what.is_some() {
                    write!(f, "FROM ")?;
                }
                write!(f, "{})", expr.sql(dialect)?)?;
            }
        }
        Ok(())
    }
}

fn display_comma_separated_dot(parts: &[Ident], dialect: &Dialect) -> Result<String, FedError> {
    let mut out = String::new();
    let mut first = true;
    for part in parts {
        if !first {
            out.push('.');
        }
        first = false;
        out.push_str(&part.sql(dialect)?);
    }
    Ok(out)
}

/// `name(args)`, e.g. `COUNT(*)` or `SUBSTR(x, 1, 3)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    pub name: ObjectName,
    pub args: Vec<FunctionArg>,
    pub distinct: bool,
}

impl DialectDisplay for Function {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        write!(
            f,
            "{}({}{})",
            self.name.sql(dialect)?,
            if self.distinct { "DISTINCT " } else { "" },
            display_comma_separated(&self.args).sql(dialect)?
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FunctionArg {
    Named { name: Ident, arg: Expr },
    Unnamed(Expr),
}

impl DialectDisplay for FunctionArg {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        match self {
            FunctionArg::Named { name, arg } => write!(f, "{} => {}", name.sql(dialect)?, arg.sql(dialect)?)?,
            FunctionArg::Unnamed(expr) => write!(f, "{}", expr.sql(dialect)?)?,
        }
        Ok(())
    }
}
