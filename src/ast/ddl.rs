//! Extended statements and a minimal DML pass-through surface: write-path
//! federation beyond single-source DML pass-through is out of scope, but
//! pass-through DML still needs an AST shape to parse into and push down
//! as one unit.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, DialectDisplay};
use crate::error::FedError;

use super::{display_comma_separated, Expr, Ident, ObjectName, Position, Query};

/// The top-level AST node returned by `parse`/`parse_extended`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Statement {
    Query(Box<Query>),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    ShowTables(ShowTables),
    ShowSchemas(ShowSchemas),
    Use(UseSchema),
}

impl Statement {
    pub fn position(&self) -> Position {
        match self {
            Statement::Query(_) => Position::default(),
            Statement::Insert(s) => s.position,
            Statement::Update(s) => s.position,
            Statement::Delete(s) => s.position,
            Statement::ShowTables(s) => s.position,
            Statement::ShowSchemas(s) => s.position,
            Statement::Use(s) => s.position,
        }
    }
}

impl DialectDisplay for Statement {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        match self {
            Statement::Query(q) => write!(f, "{}", q.sql(dialect)?)?,
            Statement::Insert(s) => write!(f, "{}", s.sql(dialect)?)?,
            Statement::Update(s) => write!(f, "{}", s.sql(dialect)?)?,
            Statement::Delete(s) => write!(f, "{}", s.sql(dialect)?)?,
            Statement::ShowTables(s) => write!(f, "{}", s.sql(dialect)?)?,
            Statement::ShowSchemas(s) => write!(f, "{}", s.sql(dialect)?)?,
            Statement::Use(s) => write!(f, "{}", s.sql(dialect)?)?,
        }
        Ok(())
    }
}

/// `SHOW TABLES [(FROM|IN) ident] [LIKE string_lit] [WHERE expr]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShowTables {
    pub db: Option<Ident>,
    pub like_pattern: Option<String>,
    pub filter: Option<Expr>,
    pub position: Position,
}

impl DialectDisplay for ShowTables {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        write!(f, "SHOW TABLES")?;
        if let Some(db) = &self.db {
            write!(f, " FROM {}", db.sql(dialect)?)?;
        }
        if let Some(pattern) = &self.like_pattern {
            write!(f, " LIKE '{}'", pattern.replace('\'', "''"))?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter.sql(dialect)?)?;
        }
        Ok(())
    }
}

/// `SHOW (DATABASES|SCHEMAS) [LIKE string_lit]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShowSchemas {
    pub like_pattern: Option<String>,
    pub position: Position,
}

impl DialectDisplay for ShowSchemas {
    fn fmt(&self, f: &mut (dyn fmt::Write), _dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        write!(f, "SHOW SCHEMAS")?;
        if let Some(pattern) = &self.like_pattern {
            write!(f, " LIKE '{}'", pattern.replace('\'', "''"))?;
        }
        Ok(())
    }
}

/// `USE ident`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UseSchema {
    pub name: Ident,
    pub position: Position,
}

impl DialectDisplay for UseSchema {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        Ok(write!(f, "USE {}", self.name.sql(dialect)?)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Insert {
    pub table: ObjectName,
    pub columns: Vec<Ident>,
    pub source: Box<Query>,
    pub position: Position,
}

impl DialectDisplay for Insert {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        write!(f, "INSERT INTO {}", self.table.sql(dialect)?)?;
        if !self.columns.is_empty() {
            write!(f, " ({})", display_comma_separated(&self.columns).sql(dialect)?)?;
        }
        write!(f, " {}", self.source.sql(dialect)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assignment {
    pub target: Ident,
    pub value: Expr,
}

impl DialectDisplay for Assignment {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        Ok(write!(f, "{} = {}", self.target.sql(dialect)?, self.value.sql(dialect)?)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Update {
    pub table: ObjectName,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Expr>,
    pub position: Position,
}

impl DialectDisplay for Update {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        write!(
            f,
            "UPDATE {} SET {}",
            self.table.sql(dialect)?,
            display_comma_separated(&self.assignments).sql(dialect)?
        )?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection.sql(dialect)?)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Delete {
    pub table: ObjectName,
    pub selection: Option<Expr>,
    pub position: Position,
}

impl DialectDisplay for Delete {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError> {
        use std::fmt::Write as _;
        write!(f, "DELETE FROM {}", self.table.sql(dialect)?)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection.sql(dialect)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_tables_renders_all_clauses() {
        let stmt = ShowTables {
            db: Some(Ident::new("mydb")),
            like_pattern: Some("user%".to_string()),
            filter: None,
            position: Position::default(),
        };
        assert_eq!(
            stmt.sql(&Dialect::mysql()).unwrap(),
            "SHOW TABLES FROM mydb LIKE 'user%'"
        );
    }

    #[test]
    fn show_tables_with_no_optional_clauses() {
        let stmt = ShowTables {
            db: None,
            like_pattern: None,
            filter: None,
            position: Position::default(),
        };
        assert_eq!(stmt.sql(&Dialect::mysql()).unwrap(), "SHOW TABLES");
    }

    #[test]
    fn use_schema_renders() {
        let stmt = UseSchema {
            name: Ident::new("analytics"),
            position: Position::default(),
        };
        assert_eq!(stmt.sql(&Dialect::ansi()).unwrap(), "USE analytics");
    }
}
