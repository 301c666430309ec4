//! Dialect registry and rendering. Each dialect owns an
//! identifier-quoting policy, pagination encoding, boolean literal encoding,
//! and a "current timestamp" token.
//!
//! The `Dialect` struct and the `DialectDisplay` contract follow a
//! one-constructor-per-variant shape (`Dialect::mysql()`,
//! `Dialect::oracle()`, ...), generalized from "which built-in functions
//! exist" to "how does this SQL product encode
//! quoting/pagination/booleans/now()".

mod registry;

pub use registry::DialectRegistry;

use std::fmt;

use crate::error::FedError;

/// The six dialects the converter and parser recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DialectTag {
    Mysql,
    Postgresql,
    Oracle,
    SqlServer,
    Hive,
    Ansi,
}

impl DialectTag {
    pub const ALL: [DialectTag; 6] = [
        DialectTag::Mysql,
        DialectTag::Postgresql,
        DialectTag::Oracle,
        DialectTag::SqlServer,
        DialectTag::Hive,
        DialectTag::Ansi,
    ];
}

impl fmt::Display for DialectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectTag::Mysql => "MySQL",
            DialectTag::Postgresql => "PostgreSQL",
            DialectTag::Oracle => "Oracle",
            DialectTag::SqlServer => "SQL Server",
            DialectTag::Hive => "Hive",
            DialectTag::Ansi => "ANSI",
        };
        f.write_str(name)
    }
}

/// How a dialect renders `LIMIT`/`OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `LIMIT n OFFSET k` (MySQL, Postgres).
    LimitOffset,
    /// `LIMIT n` only, no offset support (Hive).
    LimitOnly,
    /// `OFFSET k ROWS FETCH NEXT n ROWS ONLY` (SQL Server, Oracle 12c+).
    OffsetFetch,
    /// `WHERE ROWNUM BETWEEN k+1 AND k+n` (Oracle legacy).
    RownumBetween,
    /// `FETCH FIRST n ROWS ONLY`, no offset support (ANSI).
    FetchFirstOnly,
}

/// How a dialect encodes boolean literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanEncoding {
    TrueFalse,
    OneZero,
}

/// Per-dialect rendering configuration. Constructed once per `DialectTag`
/// and treated as read-only thereafter.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    pub tag: DialectTag,
    pub quote_char: char,
    pub pagination: PaginationStyle,
    pub boolean_encoding: BooleanEncoding,
    pub now_token: &'static str,
    /// `Some("DUAL")` for Oracle's mandatory `FROM DUAL` on an empty FROM.
    pub empty_from_table: Option<&'static str>,
}

impl Dialect {
    pub const fn mysql() -> Self {
        Self {
            tag: DialectTag::Mysql,
            quote_char: '`',
            pagination: PaginationStyle::LimitOffset,
            boolean_encoding: BooleanEncoding::OneZero,
            now_token: "NOW()",
            empty_from_table: None,
        }
    }

    pub const fn postgresql() -> Self {
        Self {
            tag: DialectTag::Postgresql,
            quote_char: '"',
            pagination: PaginationStyle::LimitOffset,
            boolean_encoding: BooleanEncoding::TrueFalse,
            now_token: "NOW()",
            empty_from_table: None,
        }
    }

    /// Oracle 12c+ style: `OFFSET ... FETCH NEXT ... ROWS ONLY`.
    pub const fn oracle() -> Self {
        Self {
            tag: DialectTag::Oracle,
            quote_char: '"',
            pagination: PaginationStyle::OffsetFetch,
            boolean_encoding: BooleanEncoding::OneZero,
            now_token: "SYSDATE",
            empty_from_table: Some("DUAL"),
        }
    }

    /// Pre-12c Oracle, using the `ROWNUM` pseudo-column for pagination.
    pub const fn oracle_legacy() -> Self {
        Self {
            pagination: PaginationStyle::RownumBetween,
            ..Self::oracle()
        }
    }

    pub const fn sql_server() -> Self {
        Self {
            tag: DialectTag::SqlServer,
            quote_char: '[',
            pagination: PaginationStyle::OffsetFetch,
            boolean_encoding: BooleanEncoding::OneZero,
            now_token: "GETDATE()",
            empty_from_table: None,
        }
    }

    pub const fn hive() -> Self {
        Self {
            tag: DialectTag::Hive,
            quote_char: '`',
            pagination: PaginationStyle::LimitOnly,
            boolean_encoding: BooleanEncoding::TrueFalse,
            now_token: "CURRENT_TIMESTAMP",
            empty_from_table: None,
        }
    }

    pub const fn ansi() -> Self {
        Self {
            tag: DialectTag::Ansi,
            quote_char: '"',
            pagination: PaginationStyle::FetchFirstOnly,
            boolean_encoding: BooleanEncoding::TrueFalse,
            now_token: "CURRENT_TIMESTAMP",
            empty_from_table: None,
        }
    }

    pub const fn for_tag(tag: DialectTag) -> Self {
        match tag {
            DialectTag::Mysql => Self::mysql(),
            DialectTag::Postgresql => Self::postgresql(),
            DialectTag::Oracle => Self::oracle(),
            DialectTag::SqlServer => Self::sql_server(),
            DialectTag::Hive => Self::hive(),
            DialectTag::Ansi => Self::ansi(),
        }
    }

    /// The closing quote character. Only `[` is asymmetric (SQL Server).
    pub fn closing_quote_char(&self) -> char {
        match self.quote_char {
            '[' => ']',
            c => c,
        }
    }

    /// Quote an identifier, doubling any embedded instance of the closing
    /// quote character.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let open = self.quote_char;
        let close = self.closing_quote_char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(open);
        for c in ident.chars() {
            if c == close {
                out.push(close);
                out.push(close);
            } else {
                out.push(c);
            }
        }
        out.push(close);
        out
    }

    pub fn boolean_literal(&self, value: bool) -> &'static str {
        match (self.boolean_encoding, value) {
            (BooleanEncoding::TrueFalse, true) => "TRUE",
            (BooleanEncoding::TrueFalse, false) => "FALSE",
            (BooleanEncoding::OneZero, true) => "1",
            (BooleanEncoding::OneZero, false) => "0",
        }
    }
}

/// A reference is "`fmt`" inside node `fmt` implementations importing
/// `crate::ast::*`; see `ast/mod.rs`'s `pub use std::fmt;` re-export.
pub trait DialectDisplay {
    fn fmt(&self, f: &mut (dyn fmt::Write), dialect: &Dialect) -> Result<(), FedError>;

    fn sql(&self, dialect: &Dialect) -> Result<String, FedError>
    where
        Self: Sized,
    {
        let mut repr = String::new();
        DialectDisplay::fmt(self, &mut repr, dialect)?;
        Ok(repr)
    }
}

/// A writer contract parameterizing the pretty-printer: token
/// emission, keyword emission, and indent level, independent of whether the
/// sink is a `String`, a file, or a test buffer.
pub trait SqlWriter {
    fn emit_token(&mut self, token: &str) -> fmt::Result;
    fn emit_keyword(&mut self, keyword: &str) -> fmt::Result;
    fn indent_level(&self) -> usize;
    fn set_indent_level(&mut self, level: usize);
}

/// A minimal `SqlWriter` over a `String`, with no indentation tracking
/// beyond bookkeeping the level (single-line rendering, as every
/// `DialectDisplay` impl in this crate produces).
pub struct StringWriter {
    pub buffer: String,
    indent: usize,
}

impl StringWriter {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            indent: 0,
        }
    }
}

impl Default for StringWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlWriter for StringWriter {
    fn emit_token(&mut self, token: &str) -> fmt::Result {
        self.buffer.push_str(token);
        Ok(())
    }

    fn emit_keyword(&mut self, keyword: &str) -> fmt::Result {
        self.buffer.push_str(keyword);
        Ok(())
    }

    fn indent_level(&self) -> usize {
        self.indent
    }

    fn set_indent_level(&mut self, level: usize) {
        self.indent = level;
    }
}
