//! Schema catalog: the in-memory record of what tables and
//! columns each connected data source exposes, and the one-stop name
//! resolver the planner consults to turn an AST identifier into a concrete
//! column or table.

use std::collections::HashMap;

use crate::ast::Ident;
use crate::error::{FedError, FedResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Physical,
    Logical,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableType {
    Table,
    View,
    SystemTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub native_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    /// 1-based, contiguous within a table.
    pub ordinal_position: u32,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub schema: String,
    pub index_type: String,
    pub unique: bool,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub schema: String,
    pub catalog: Option<String>,
    pub table_type: TableType,
    pub remarks: Option<String>,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

impl Table {
    /// Case-insensitive lookup, matching the default identifier
    /// resolution rule; callers holding a quoted identifier should compare
    /// the returned column's name case-sensitively themselves.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Like `column`, but honors `ident`'s quoted flag: a quoted identifier
    /// is matched case-sensitively, an unquoted one case-insensitively.
    fn column_matching(&self, ident: &Ident) -> Option<&Column> {
        self.columns.iter().find(|c| ident.matches(&c.name))
    }

    fn validate(&self) -> FedResult<()> {
        let mut seen = std::collections::HashSet::new();
        for (i, col) in self.columns.iter().enumerate() {
            let expected = (i + 1) as u32;
            if col.ordinal_position != expected {
                return Err(FedError::semantic(format!(
                    "table '{}' column '{}' has ordinal position {}, expected contiguous {}",
                    self.name, col.name, col.ordinal_position, expected
                )));
            }
            if !seen.insert(col.name.to_ascii_lowercase()) {
                return Err(FedError::semantic(format!(
                    "table '{}' has duplicate column name '{}' (case-insensitive)",
                    self.name, col.name
                )));
            }
        }
        for index in &self.indexes {
            for col_name in &index.column_names {
                if self.column(col_name).is_none() {
                    return Err(FedError::semantic(format!(
                        "index '{}' references unknown column '{}' on table '{}'",
                        index.name, col_name, self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub catalog: Option<String>,
    pub schema_type: SchemaType,
    pub data_source_name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Like `table`, but honors `ident`'s quoted flag the way `column_matching` does.
    fn table_matching(&self, ident: &Ident) -> Option<&Table> {
        self.tables.iter().find(|t| ident.matches(&t.name))
    }
}

/// What `resolve` found for a qualified name.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Table(&'a Table),
    Column { table: &'a Table, column: &'a Column },
}

/// In-memory record of every discovered schema, keyed by data-source name.
/// Populated by adapter discovery, invalidated on explicit refresh or
/// an adapter health transition to `Down`.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Schema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema`, validating its invariants first: contiguous
    /// 1-based ordinals, unique column names, valid index column
    /// references.
    pub fn discover(&mut self, schema: Schema) -> FedResult<()> {
        for table in &schema.tables {
            table.validate()?;
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Drops a previously discovered schema (explicit refresh, or an
    /// adapter health transition to `Down`).
    pub fn invalidate(&mut self, schema_name: &str) {
        self.schemas.remove(schema_name);
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn list_tables(&self, schema_name: &str) -> FedResult<&[Table]> {
        self.schema(schema_name)
            .map(|s| s.tables.as_slice())
            .ok_or_else(|| FedError::semantic(format!("unknown schema '{schema_name}'")))
    }

    /// Resolves `schema.table` or `schema.table.column` (or the unqualified
    /// `table`/`table.column` form, searched across every known schema).
    /// Each part is matched via `Ident::matches`: case-insensitively unless
    /// that part was quoted in the source, in which case case-sensitively.
    /// Ambiguous matches across schemas fail with `AmbiguousReference`.
    pub fn resolve(&self, parts: &[Ident]) -> FedResult<Resolved<'_>> {
        match parts {
            [table] => self.resolve_unqualified_table(table),
            [table, column] => {
                let Resolved::Table(t) = self.resolve_unqualified_table(table)? else {
                    unreachable!("resolve_unqualified_table only ever returns Table")
                };
                match t.column_matching(column) {
                    Some(c) => Ok(Resolved::Column { table: t, column: c }),
                    None => Err(FedError::semantic(format!(
                        "no column '{}' on table '{}'",
                        column.value, table.value
                    ))),
                }
            }
            [schema, table, column] => {
                let s = self
                    .schema(&schema.value)
                    .ok_or_else(|| FedError::semantic(format!("unknown schema '{}'", schema.value)))?;
                let t = s.table_matching(table).ok_or_else(|| {
                    FedError::semantic(format!("unknown table '{}.{}'", schema.value, table.value))
                })?;
                let c = t.column_matching(column).ok_or_else(|| {
                    FedError::semantic(format!(
                        "no column '{}' on table '{}.{}'",
                        column.value, schema.value, table.value
                    ))
                })?;
                Ok(Resolved::Column { table: t, column: c })
            }
            _ => Err(FedError::semantic("qualified name has too many parts to resolve")),
        }
    }

    /// Returns the data source that owns `table_name`, resolved the same
    /// way `resolve` resolves an unqualified table reference. Consulted by
    /// the physical planner to decide whether a sub-tree's leaves
    /// all share a single data source.
    pub fn data_source_for_table(&self, table_name: &str) -> FedResult<&str> {
        let mut matches: Vec<&str> = Vec::new();
        for schema in self.schemas.values() {
            if schema.table(table_name).is_some() {
                matches.push(schema.data_source_name.as_str());
            }
        }
        match matches.len() {
            0 => Err(FedError::semantic(format!("unknown table '{table_name}'"))),
            1 => Ok(matches[0]),
            _ => Err(FedError::AmbiguousReference {
                name: table_name.to_string(),
                candidates: matches.into_iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    fn resolve_unqualified_table(&self, table: &Ident) -> FedResult<Resolved<'_>> {
        let mut matches: Vec<(&str, &Table)> = Vec::new();
        for schema in self.schemas.values() {
            if let Some(t) = schema.table_matching(table) {
                matches.push((schema.name.as_str(), t));
            }
        }
        match matches.len() {
            0 => Err(FedError::semantic(format!("unknown table '{}'", table.value))),
            1 => Ok(Resolved::Table(matches[0].1)),
            _ => Err(FedError::AmbiguousReference {
                name: table.value.clone(),
                candidates: matches.into_iter().map(|(s, _)| s.to_string()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table {
            name: "users".to_string(),
            schema: "public".to_string(),
            catalog: None,
            table_type: TableType::Table,
            remarks: None,
            columns: vec![
                Column {
                    name: "id".to_string(),
                    data_type: "integer".to_string(),
                    native_type: "int4".to_string(),
                    nullable: false,
                    primary_key: true,
                    ordinal_position: 1,
                    default_value: None,
                },
                Column {
                    name: "email".to_string(),
                    data_type: "text".to_string(),
                    native_type: "varchar".to_string(),
                    nullable: true,
                    primary_key: false,
                    ordinal_position: 2,
                    default_value: None,
                },
            ],
            indexes: vec![],
        }
    }

    fn sample_schema(data_source_name: &str) -> Schema {
        Schema {
            name: "public".to_string(),
            catalog: None,
            schema_type: SchemaType::Physical,
            data_source_name: data_source_name.to_string(),
            tables: vec![sample_table()],
        }
    }

    #[test]
    fn discover_rejects_non_contiguous_ordinals() {
        let mut table = sample_table();
        table.columns[1].ordinal_position = 3;
        let schema = Schema { tables: vec![table], ..sample_schema("pg1") };
        let mut catalog = SchemaCatalog::new();
        assert!(catalog.discover(schema).is_err());
    }

    #[test]
    fn resolve_unqualified_table_succeeds_when_unique() {
        let mut catalog = SchemaCatalog::new();
        catalog.discover(sample_schema("pg1")).unwrap();
        let resolved = catalog.resolve(&[Ident::new("users")]).unwrap();
        assert!(matches!(resolved, Resolved::Table(t) if t.name == "users"));
    }

    #[test]
    fn resolve_column_case_insensitive() {
        let mut catalog = SchemaCatalog::new();
        catalog.discover(sample_schema("pg1")).unwrap();
        let resolved = catalog.resolve(&[Ident::new("users"), Ident::new("EMAIL")]).unwrap();
        assert!(matches!(resolved, Resolved::Column { column, .. } if column.name == "email"));
    }

    #[test]
    fn resolve_quoted_column_is_case_sensitive() {
        let mut catalog = SchemaCatalog::new();
        catalog.discover(sample_schema("pg1")).unwrap();
        let err = catalog.resolve(&[Ident::new("users"), Ident::quoted("EMAIL", '"')]).unwrap_err();
        assert!(matches!(err, FedError::Semantic { .. }));
        let resolved = catalog.resolve(&[Ident::new("users"), Ident::quoted("email", '"')]).unwrap();
        assert!(matches!(resolved, Resolved::Column { column, .. } if column.name == "email"));
    }

    #[test]
    fn resolve_ambiguous_across_schemas_fails() {
        let mut catalog = SchemaCatalog::new();
        catalog.discover(sample_schema("pg1")).unwrap();
        let mut second = sample_schema("pg2");
        second.name = "reporting".to_string();
        catalog.discover(second).unwrap();
        let err = catalog.resolve(&[Ident::new("users")]).unwrap_err();
        assert!(matches!(err, FedError::AmbiguousReference { .. }));
    }

    #[test]
    fn data_source_for_table_looks_up_owning_schema() {
        let mut catalog = SchemaCatalog::new();
        catalog.discover(sample_schema("pg1")).unwrap();
        assert_eq!(catalog.data_source_for_table("users").unwrap(), "pg1");
    }

    #[test]
    fn invalidate_removes_schema() {
        let mut catalog = SchemaCatalog::new();
        catalog.discover(sample_schema("pg1")).unwrap();
        catalog.invalidate("public");
        assert!(catalog.schema("public").is_none());
    }
}
