use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, DialectDisplay};
use crate::error::FedError;

use super::position::Position;

/// An identifier, possibly quoted. Case-preserving; compared
/// case-insensitively unless `quote_style` marks it as quoted, in which case
/// comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ident {
    pub value: String,
    /// `Some(quote_char)` when the identifier appeared quoted in the source;
    /// doubles as the case-sensitivity flag.
    pub quote_style: Option<char>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub position: Position,
}

impl Ident {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote_style: None,
            position: Position::default(),
        }
    }

    pub fn quoted(value: impl Into<String>, quote: char) -> Self {
        Self {
            value: value.into(),
            quote_style: Some(quote),
            position: Position::default(),
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn is_quoted(&self) -> bool {
        self.quote_style.is_some()
    }

    /// Case-insensitive unless quoted.
    pub fn matches(&self, other: &str) -> bool {
        if self.is_quoted() {
            self.value == other
        } else {
            self.value.eq_ignore_ascii_case(other)
        }
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Ident::new(value)
    }
}

impl DialectDisplay for Ident {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        if self.quote_style.is_some() {
            write!(f, "{}", dialect.quote_identifier(&self.value))?;
        } else {
            write!(f, "{}", self.value)?;
        }
        Ok(())
    }
}

/// A possibly-compound identifier: `schema.table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectName(pub Vec<Ident>);

impl ObjectName {
    pub fn single(ident: impl Into<Ident>) -> Self {
        ObjectName(vec![ident.into()])
    }

    pub fn last(&self) -> Option<&Ident> {
        self.0.last()
    }
}

impl DialectDisplay for ObjectName {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        let mut first = true;
        for part in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            write!(f, "{}", part.sql(dialect)?)?;
        }
        Ok(())
    }
}

impl From<Vec<Ident>> for ObjectName {
    fn from(parts: Vec<Ident>) -> Self {
        ObjectName(parts)
    }
}
