//! Scalar expression evaluation against a materialized `Row`,
//! shared by `Filter`, `Project`, `Sort`'s comparator, and `Aggregate`'s
//! group-by keys. SQL's three-valued logic applies throughout: any operand
//! that is `NULL` makes the result `NULL` rather than `true`/`false`.

use std::cmp::Ordering;

use crate::ast::{BinaryOperator, Expr, UnaryOperator, Value};
use crate::error::FedError;
use crate::exec::row::Row;

pub fn eval(expr: &Expr, row: &Row) -> Result<Value, FedError> {
    match expr {
        Expr::Value(v) => Ok(v.clone()),
        Expr::Identifier(ident) => Ok(row.get(&ident.value).cloned().unwrap_or(Value::Null)),
        Expr::CompoundIdentifier(parts) => {
            let name = parts.last().map(|i| i.value.as_str()).unwrap_or("");
            Ok(row.get(name).cloned().unwrap_or(Value::Null))
        }
        Expr::Nested(inner) => eval(inner, row),
        Expr::Cast { expr, .. } => eval(expr, row),
        Expr::UnaryOp { op, expr } => eval_unary(op, &eval(expr, row)?),
        Expr::BinaryOp { left, op, right } => eval_binary(op, &eval(left, row)?, &eval(right, row)?),
        Expr::IsNull(inner) => Ok(Value::Boolean(matches!(eval(inner, row)?, Value::Null))),
        Expr::IsNotNull(inner) => Ok(Value::Boolean(!matches!(eval(inner, row)?, Value::Null))),
        Expr::Between { expr, negated, low, high } => {
            let v = eval(expr, row)?;
            let lo = eval(low, row)?;
            let hi = eval(high, row)?;
            if is_null(&v) || is_null(&lo) || is_null(&hi) {
                return Ok(Value::Null);
            }
            let within = compare(&v, &lo)? != Ordering::Less && compare(&v, &hi)? != Ordering::Greater;
            Ok(Value::Boolean(within != *negated))
        }
        Expr::InList { expr, list, negated } => {
            let v = eval(expr, row)?;
            if is_null(&v) {
                return Ok(Value::Null);
            }
            let mut found = false;
            let mut saw_null = false;
            for item in list {
                let iv = eval(item, row)?;
                if is_null(&iv) {
                    saw_null = true;
                    continue;
                }
                if compare(&v, &iv)? == Ordering::Equal {
                    found = true;
                    break;
                }
            }
            if found {
                Ok(Value::Boolean(!*negated))
            } else if saw_null {
                Ok(Value::Null)
            } else {
                Ok(Value::Boolean(*negated))
            }
        }
        Expr::Case { operand, conditions, results, else_result } => {
            for (cond, res) in conditions.iter().zip(results.iter()) {
                let matched = match operand {
                    Some(operand_expr) => {
                        let lhs = eval(operand_expr, row)?;
                        let rhs = eval(cond, row)?;
                        !is_null(&lhs) && !is_null(&rhs) && compare(&lhs, &rhs)? == Ordering::Equal
                    }
                    None => is_true(&eval(cond, row)?),
                };
                if matched {
                    return eval(res, row);
                }
            }
            match else_result {
                Some(e) => eval(e, row),
                None => Ok(Value::Null),
            }
        }
        other => Err(FedError::Plan { message: format!("cannot evaluate expression at execution time: {other:?}") }),
    }
}

/// SQL three-valued `true`: `NULL` and `false` both fail a `WHERE`/`ON`/`HAVING` test.
pub fn is_true(value: &Value) -> bool {
    matches!(value, Value::Boolean(true))
}

fn is_null(value: &Value) -> bool {
    matches!(value, Value::Null)
}

/// SQL's three-valued truth as `Option<bool>`: `None` stands in for `NULL`.
fn tri(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Null => None,
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n, _) => n.parse::<f64>().ok(),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::SingleQuotedString(s)
        | Value::DoubleQuotedString(s)
        | Value::EscapedStringLiteral(s)
        | Value::NationalStringLiteral(s) => Some(s.as_str()),
        _ => None,
    }
}

fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

pub fn compare(a: &Value, b: &Value) -> Result<Ordering, FedError> {
    if let (Some(af), Some(bf)) = (as_f64(a), as_f64(b)) {
        return af.partial_cmp(&bf).ok_or_else(|| FedError::Plan { message: "cannot compare NaN values".to_string() });
    }
    if let (Some(a_str), Some(b_str)) = (as_str(a), as_str(b)) {
        return Ok(a_str.cmp(b_str));
    }
    Err(FedError::Plan { message: format!("cannot compare incompatible values {a:?} and {b:?}") })
}

fn like_matches(value: &str, pattern: &str, case_insensitive: bool) -> bool {
    let (value, pattern) =
        if case_insensitive { (value.to_lowercase(), pattern.to_lowercase()) } else { (value.to_string(), pattern.to_string()) };
    like_matches_chars(value.as_bytes(), pattern.as_bytes())
}

fn like_matches_chars(value: &[u8], pattern: &[u8]) -> bool {
    match pattern.first() {
        None => value.is_empty(),
        Some(b'%') => {
            like_matches_chars(value, &pattern[1..])
                || (!value.is_empty() && like_matches_chars(&value[1..], pattern))
        }
        Some(b'_') => !value.is_empty() && like_matches_chars(&value[1..], &pattern[1..]),
        Some(c) => !value.is_empty() && value[0] == *c && like_matches_chars(&value[1..], &pattern[1..]),
    }
}

fn eval_unary(op: &UnaryOperator, value: &Value) -> Result<Value, FedError> {
    match op {
        UnaryOperator::Not => {
            if is_null(value) {
                Ok(Value::Null)
            } else {
                Ok(Value::Boolean(!is_true(value)))
            }
        }
        UnaryOperator::Minus => match as_f64(value) {
            Some(n) => Ok(Value::Number(format_number(-n), false)),
            None if is_null(value) => Ok(Value::Null),
            None => Err(FedError::Plan { message: format!("cannot negate non-numeric value {value:?}") }),
        },
        UnaryOperator::Plus => match as_f64(value) {
            Some(n) => Ok(Value::Number(format_number(n), false)),
            None if is_null(value) => Ok(Value::Null),
            None => Err(FedError::Plan { message: format!("cannot apply unary + to non-numeric value {value:?}") }),
        },
    }
}

fn eval_binary(op: &BinaryOperator, left: &Value, right: &Value) -> Result<Value, FedError> {
    match op {
        BinaryOperator::And => {
            let l = tri(left);
            let r = tri(right);
            if l == Some(false) || r == Some(false) {
                Ok(Value::Boolean(false))
            } else if l == Some(true) && r == Some(true) {
                Ok(Value::Boolean(true))
            } else {
                Ok(Value::Null)
            }
        }
        BinaryOperator::Or => {
            let l = tri(left);
            let r = tri(right);
            if l == Some(true) || r == Some(true) {
                Ok(Value::Boolean(true))
            } else if l == Some(false) && r == Some(false) {
                Ok(Value::Boolean(false))
            } else {
                Ok(Value::Null)
            }
        }
        BinaryOperator::Eq | BinaryOperator::NotEq | BinaryOperator::Gt | BinaryOperator::Lt | BinaryOperator::GtEq | BinaryOperator::LtEq => {
            if is_null(left) || is_null(right) {
                return Ok(Value::Null);
            }
            let ordering = compare(left, right)?;
            Ok(Value::Boolean(match op {
                BinaryOperator::Eq => ordering == Ordering::Equal,
                BinaryOperator::NotEq => ordering != Ordering::Equal,
                BinaryOperator::Gt => ordering == Ordering::Greater,
                BinaryOperator::Lt => ordering == Ordering::Less,
                BinaryOperator::GtEq => ordering != Ordering::Less,
                BinaryOperator::LtEq => ordering != Ordering::Greater,
                _ => unreachable!(),
            }))
        }
        BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => {
            if is_null(left) || is_null(right) {
                return Ok(Value::Null);
            }
            let (lf, rf) = match (as_f64(left), as_f64(right)) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(FedError::Plan { message: format!("cannot apply arithmetic to {left:?} and {right:?}") }),
            };
            let result = match op {
                BinaryOperator::Plus => lf + rf,
                BinaryOperator::Minus => lf - rf,
                BinaryOperator::Multiply => lf * rf,
                BinaryOperator::Divide if rf != 0.0 => lf / rf,
                BinaryOperator::Divide => return Err(FedError::Plan { message: "division by zero".to_string() }),
                BinaryOperator::Modulo if rf != 0.0 => lf % rf,
                BinaryOperator::Modulo => return Err(FedError::Plan { message: "modulo by zero".to_string() }),
                _ => unreachable!(),
            };
            Ok(Value::Number(format_number(result), false))
        }
        BinaryOperator::Concat => {
            if is_null(left) || is_null(right) {
                return Ok(Value::Null);
            }
            Ok(Value::SingleQuotedString(format!("{}{}", display_value(left), display_value(right))))
        }
        BinaryOperator::Like | BinaryOperator::NotLike | BinaryOperator::ILike | BinaryOperator::NotILike => {
            if is_null(left) || is_null(right) {
                return Ok(Value::Null);
            }
            let (value_str, pattern_str) = match (as_str(left), as_str(right)) {
                (Some(v), Some(p)) => (v, p),
                _ => return Err(FedError::Plan { message: "LIKE requires string operands".to_string() }),
            };
            let case_insensitive = matches!(op, BinaryOperator::ILike | BinaryOperator::NotILike);
            let matched = like_matches(value_str, pattern_str, case_insensitive);
            let negated = matches!(op, BinaryOperator::NotLike | BinaryOperator::NotILike);
            Ok(Value::Boolean(matched != negated))
        }
        BinaryOperator::BitwiseAnd | BinaryOperator::BitwiseOr | BinaryOperator::BitwiseXor => {
            if is_null(left) || is_null(right) {
                return Ok(Value::Null);
            }
            let (li, ri) = match (as_f64(left), as_f64(right)) {
                (Some(l), Some(r)) => (l as i64, r as i64),
                _ => return Err(FedError::Plan { message: "bitwise operator requires numeric operands".to_string() }),
            };
            let result = match op {
                BinaryOperator::BitwiseAnd => li & ri,
                BinaryOperator::BitwiseOr => li | ri,
                BinaryOperator::BitwiseXor => li ^ ri,
                _ => unreachable!(),
            };
            Ok(Value::Number(result.to_string(), false))
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Number(n, _) => n.clone(),
        Value::SingleQuotedString(s)
        | Value::DoubleQuotedString(s)
        | Value::EscapedStringLiteral(s)
        | Value::NationalStringLiteral(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ident;

    fn row() -> Row {
        Row::new(
            vec!["age".to_string(), "name".to_string()],
            vec![Value::Number("30".to_string(), false), Value::SingleQuotedString("Ada".to_string())],
        )
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier(Ident::new(name))
    }

    #[test]
    fn identifier_looks_up_column_by_name() {
        assert_eq!(eval(&ident("age"), &row()).unwrap(), Value::Number("30".to_string(), false));
    }

    #[test]
    fn comparison_against_null_is_null_not_false() {
        let expr = Expr::BinaryOp {
            left: Box::new(ident("age")),
            op: BinaryOperator::Eq,
            right: Box::new(Expr::Value(Value::Null)),
        };
        assert_eq!(eval(&expr, &row()).unwrap(), Value::Null);
    }

    #[test]
    fn and_with_one_false_operand_is_false_even_if_other_is_null() {
        let expr = Expr::BinaryOp {
            left: Box::new(Expr::Value(Value::Boolean(false))),
            op: BinaryOperator::And,
            right: Box::new(Expr::Value(Value::Null)),
        };
        assert_eq!(eval(&expr, &row()).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn like_supports_percent_and_underscore_wildcards() {
        assert!(like_matches("Ada", "A_a", false));
        assert!(like_matches("Ada Lovelace", "Ada%", false));
        assert!(!like_matches("Ada", "Bob%", false));
    }

    #[test]
    fn arithmetic_on_column_values_folds_at_row_time() {
        let expr = Expr::BinaryOp { left: Box::new(ident("age")), op: BinaryOperator::Plus, right: Box::new(Expr::Value(Value::Number("1".to_string(), false))) };
        assert_eq!(eval(&expr, &row()).unwrap(), Value::Number("31".to_string(), false));
    }
}
