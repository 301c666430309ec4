//! Abstract syntax tree: a tagged-variant tree rather than a
//! class hierarchy, rendered per-dialect through [`crate::dialect::DialectDisplay`]
//! instead of a single fixed `Display` impl.

pub mod ddl;
pub mod expr;
pub mod ident;
pub mod operator;
pub mod position;
pub mod query;
pub mod value;
pub mod visitor;

pub use ddl::*;
pub use expr::*;
pub use ident::*;
pub use operator::*;
pub use position::*;
pub use query::*;
pub use value::*;
pub use visitor::*;

/// Re-exported so `use crate::ast::*;` brings the `fmt` module path into
/// scope for node `fmt` impls that spell their signature as `dyn fmt::Write`.
pub use std::fmt;

use crate::dialect::{Dialect, DialectDisplay};
use crate::error::FedError;

/// Renders a slice of [`DialectDisplay`] items joined by `sep`.
pub struct DisplaySeparated<'a, T: DialectDisplay> {
    items: &'a [T],
    sep: &'static str,
}

impl<'a, T: DialectDisplay> DialectDisplay for DisplaySeparated<'a, T> {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        let mut first = true;
        for item in self.items {
            if !first {
                write!(f, "{}", self.sep)?;
            }
            first = false;
            write!(f, "{}", item.sql(dialect)?)?;
        }
        Ok(())
    }
}

pub fn display_separated<T: DialectDisplay>(items: &[T], sep: &'static str) -> DisplaySeparated<'_, T> {
    DisplaySeparated { items, sep }
}

pub fn display_comma_separated<T: DialectDisplay>(items: &[T]) -> DisplaySeparated<'_, T> {
    display_separated(items, ", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn display_comma_separated_joins_idents() {
        let idents = vec![Ident::new("a"), Ident::new("b"), Ident::new("c")];
        let rendered = display_comma_separated(&idents).sql(&Dialect::ansi()).unwrap();
        assert_eq!(rendered, "a, b, c");
    }

    #[test]
    fn display_separated_empty_slice_renders_empty() {
        let idents: Vec<Ident> = vec![];
        let rendered = display_comma_separated(&idents).sql(&Dialect::ansi()).unwrap();
        assert_eq!(rendered, "");
    }
}
