//! Recursive-descent/Pratt parser. Grammar shape is derived directly from
//! the AST nodes `ast::query`/`ast::expr`/`ast::ddl` already expect to
//! receive, and diagnostics follow `FedError::Syntax{position, message,
//! expected}`.

use crate::ast::*;
use crate::dialect::Dialect;
use crate::error::{FedError, FedResult};

use super::lexer::Lexer;
use super::token::{Token, Word};

/// Parses one statement as `dialect`. Extended statements (`SHOW`/`USE`)
/// are accepted regardless of dialect, additively.
pub fn parse(sql: &str, dialect: &Dialect) -> FedResult<Statement> {
    Parser::new(sql, *dialect)?.parse_statement()
}

/// Parses one statement, accepting the extended grammar, independent of any
/// particular dialect's quoting/pagination conventions.
pub fn parse_extended(sql: &str) -> FedResult<Statement> {
    parse(sql, &Dialect::ansi())
}

struct Parser {
    tokens: Vec<(Token, Position)>,
    index: usize,
    #[allow(dead_code)]
    dialect: Dialect,
}

impl Parser {
    fn new(sql: &str, dialect: Dialect) -> FedResult<Self> {
        let (tokens, _comments) = Lexer::new(sql).tokenize()?;
        Ok(Self { tokens, index: 0, dialect })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index].0
    }

    fn peek_position(&self) -> Position {
        self.tokens[self.index].1
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].0.clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>, expected: Vec<String>) -> FedError {
        FedError::syntax(message, self.peek_position(), expected)
    }

    fn expect_token(&mut self, expected: &Token) -> FedResult<()> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(
                format!("expected {expected:?}, found {:?}", self.peek()),
                vec![format!("{expected:?}")],
            ))
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w.is_keyword(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> FedResult<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(
                format!("expected keyword {keyword}, found {:?}", self.peek()),
                vec![keyword.to_string()],
            ))
        }
    }

    fn consume_any_keyword(&mut self, keywords: &[&str]) -> Option<String> {
        if let Token::Word(w) = self.peek() {
            if w.quote_style.is_none() {
                for k in keywords {
                    if w.value.eq_ignore_ascii_case(k) {
                        let value = w.value.clone();
                        self.advance();
                        return Some(value);
                    }
                }
            }
        }
        None
    }

    fn parse_statement(&mut self) -> FedResult<Statement> {
        let statement = if self.peek_is_keyword("SHOW") {
            self.parse_show()?
        } else if self.peek_is_keyword("USE") {
            self.parse_use()?
        } else if self.peek_is_keyword("INSERT") {
            self.parse_insert()?
        } else if self.peek_is_keyword("UPDATE") {
            self.parse_update()?
        } else if self.peek_is_keyword("DELETE") {
            self.parse_delete()?
        } else {
            Statement::Query(Box::new(self.parse_query()?))
        };
        self.consume_token(&Token::Semicolon);
        if !matches!(self.peek(), Token::Eof) {
            return Err(self.error(
                format!("trailing input after statement: {:?}", self.peek()),
                vec!["end of statement".to_string()],
            ));
        }
        Ok(statement)
    }

    fn consume_token(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    // ---- Extended statements ----

    fn parse_show(&mut self) -> FedResult<Statement> {
        let position = self.peek_position();
        self.expect_keyword("SHOW")?;
        if self.consume_keyword("TABLES") {
            let db = if self.consume_any_keyword(&["FROM", "IN"]).is_some() {
                Some(self.parse_identifier()?)
            } else {
                None
            };
            let like_pattern = self.parse_optional_like()?;
            let filter = if self.consume_keyword("WHERE") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            return Ok(Statement::ShowTables(ShowTables { db, like_pattern, filter, position }));
        }
        if self.consume_any_keyword(&["SCHEMAS", "DATABASES"]).is_some() {
            let like_pattern = self.parse_optional_like()?;
            return Ok(Statement::ShowSchemas(ShowSchemas { like_pattern, position }));
        }
        Err(self.error(
            "expected TABLES, SCHEMAS or DATABASES after SHOW",
            vec!["TABLES".to_string(), "SCHEMAS".to_string(), "DATABASES".to_string()],
        ))
    }

    fn parse_optional_like(&mut self) -> FedResult<Option<String>> {
        if self.consume_keyword("LIKE") {
            match self.advance() {
                Token::SingleQuotedString(s) => Ok(Some(s)),
                other => Err(self.error(
                    format!("expected a string literal after LIKE, found {other:?}"),
                    vec!["string literal".to_string()],
                )),
            }
        } else {
            Ok(None)
        }
    }

    fn parse_use(&mut self) -> FedResult<Statement> {
        let position = self.peek_position();
        self.expect_keyword("USE")?;
        let name = self.parse_identifier()?;
        Ok(Statement::Use(UseSchema { name, position }))
    }

    // ---- DML ----

    fn parse_insert(&mut self) -> FedResult<Statement> {
        let position = self.peek_position();
        self.expect_keyword("INSERT")?;
        self.expect_keyword("INTO")?;
        let table = self.parse_object_name()?;
        let columns = if self.consume_token(&Token::LParen) {
            let cols = self.parse_comma_separated(Self::parse_identifier)?;
            self.expect_token(&Token::RParen)?;
            cols
        } else {
            Vec::new()
        };
        let source = Box::new(self.parse_query()?);
        Ok(Statement::Insert(Insert { table, columns, source, position }))
    }

    fn parse_update(&mut self) -> FedResult<Statement> {
        let position = self.peek_position();
        self.expect_keyword("UPDATE")?;
        let table = self.parse_object_name()?;
        self.expect_keyword("SET")?;
        let assignments = self.parse_comma_separated(|p| {
            let target = p.parse_identifier()?;
            p.expect_token(&Token::Eq)?;
            let value = p.parse_expr()?;
            Ok(Assignment { target, value })
        })?;
        let selection = if self.consume_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Update(Update { table, assignments, selection, position }))
    }

    fn parse_delete(&mut self) -> FedResult<Statement> {
        let position = self.peek_position();
        self.expect_keyword("DELETE")?;
        self.expect_keyword("FROM")?;
        let table = self.parse_object_name()?;
        let selection = if self.consume_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Delete(Delete { table, selection, position }))
    }

    // ---- Query ----

    fn parse_query(&mut self) -> FedResult<Query> {
        let with = if self.consume_keyword("WITH") {
            let recursive = self.consume_keyword("RECURSIVE");
            let cte_tables = self.parse_comma_separated(Self::parse_cte)?;
            Some(With { recursive, cte_tables })
        } else {
            None
        };

        let body = Box::new(self.parse_set_expr()?);

        let order_by = if self.consume_keyword("ORDER") {
            self.expect_keyword("BY")?;
            self.parse_comma_separated(Self::parse_order_by_expr)?
        } else {
            Vec::new()
        };

        let limit = if self.consume_keyword("LIMIT") {
            if self.consume_keyword("ALL") {
                None
            } else {
                Some(self.parse_expr()?)
            }
        } else {
            None
        };

        let offset = if self.consume_keyword("OFFSET") {
            let value = self.parse_expr()?;
            let rows = if self.consume_keyword("ROWS") {
                OffsetRows::Rows
            } else if self.consume_keyword("ROW") {
                OffsetRows::Row
            } else {
                OffsetRows::None
            };
            Some(Offset { value, rows })
        } else {
            None
        };

        let fetch = if self.consume_keyword("FETCH") {
            self.consume_any_keyword(&["FIRST", "NEXT"]);
            let quantity = if matches!(self.peek(), Token::Word(w) if w.is_keyword("ROW") || w.is_keyword("ROWS")) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let percent = self.consume_keyword("PERCENT");
            self.consume_any_keyword(&["ROW", "ROWS"]);
            let with_ties = if self.consume_keyword("WITH") {
                self.expect_keyword("TIES")?;
                true
            } else {
                self.consume_keyword("ONLY");
                false
            };
            Some(Fetch { with_ties, percent, quantity })
        } else {
            None
        };

        let lock = if self.consume_keyword("FOR") {
            if self.consume_keyword("UPDATE") {
                Some(LockType::Update)
            } else if self.consume_keyword("SHARE") {
                Some(LockType::Share)
            } else {
                return Err(self.error("expected UPDATE or SHARE after FOR", vec!["UPDATE".to_string(), "SHARE".to_string()]));
            }
        } else {
            None
        };

        Ok(Query { with, body, order_by, limit, offset, fetch, lock })
    }

    fn parse_cte(&mut self) -> FedResult<Cte> {
        let name = self.parse_identifier()?;
        let columns = if self.consume_token(&Token::LParen) {
            let cols = self.parse_comma_separated(Self::parse_identifier)?;
            self.expect_token(&Token::RParen)?;
            cols
        } else {
            Vec::new()
        };
        self.expect_keyword("AS")?;
        self.expect_token(&Token::LParen)?;
        let query = self.parse_query()?;
        self.expect_token(&Token::RParen)?;
        Ok(Cte { alias: TableAlias { name, columns }, query, from: None })
    }

    fn parse_order_by_expr(&mut self) -> FedResult<OrderByExpr> {
        let expr = self.parse_expr()?;
        let asc = if self.consume_keyword("ASC") {
            Some(true)
        } else if self.consume_keyword("DESC") {
            Some(false)
        } else {
            None
        };
        let nulls_first = if self.consume_keyword("NULLS") {
            if self.consume_keyword("FIRST") {
                Some(true)
            } else {
                self.expect_keyword("LAST")?;
                Some(false)
            }
        } else {
            None
        };
        Ok(OrderByExpr { expr, asc, nulls_first })
    }

    fn parse_set_expr(&mut self) -> FedResult<SetExpr> {
        let mut left = self.parse_set_expr_primary()?;
        loop {
            let op = if self.consume_keyword("UNION") {
                SetOperator::Union
            } else if self.consume_keyword("EXCEPT") {
                SetOperator::Except
            } else if self.consume_keyword("INTERSECT") {
                SetOperator::Intersect
            } else {
                break;
            };
            let all = self.consume_keyword("ALL");
            let right = self.parse_set_expr_primary()?;
            left = SetExpr::SetOperation {
                op,
                all,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_set_expr_primary(&mut self) -> FedResult<SetExpr> {
        if self.peek_is_keyword("VALUES") {
            return Ok(SetExpr::Values(self.parse_values()?));
        }
        if self.consume_token(&Token::LParen) {
            let query = self.parse_query()?;
            self.expect_token(&Token::RParen)?;
            return Ok(SetExpr::Query(Box::new(query)));
        }
        Ok(SetExpr::Select(Box::new(self.parse_select()?)))
    }

    fn parse_values(&mut self) -> FedResult<Values> {
        self.expect_keyword("VALUES")?;
        let rows = self.parse_comma_separated(|p| {
            p.expect_token(&Token::LParen)?;
            let row = p.parse_comma_separated(Self::parse_expr)?;
            p.expect_token(&Token::RParen)?;
            Ok(row)
        })?;
        Ok(Values(rows))
    }

    fn parse_select(&mut self) -> FedResult<Select> {
        self.expect_keyword("SELECT")?;
        let distinct = self.consume_keyword("DISTINCT");
        if !distinct {
            self.consume_keyword("ALL");
        }
        let top = if self.peek_is_keyword("TOP") {
            Some(self.parse_top()?)
        } else {
            None
        };
        let projection = self.parse_comma_separated(Self::parse_select_item)?;
        let into = None;
        let from = if self.consume_keyword("FROM") {
            self.parse_comma_separated(Self::parse_table_with_joins)?
        } else {
            Vec::new()
        };
        let lateral_views = Vec::new();
        let selection = if self.consume_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let group_by = if self.consume_keyword("GROUP") {
            self.expect_keyword("BY")?;
            self.parse_comma_separated(Self::parse_expr)?
        } else {
            Vec::new()
        };
        let having = if self.consume_keyword("HAVING") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Select {
            distinct,
            top,
            projection,
            into,
            from,
            lateral_views,
            selection,
            group_by,
            having,
        })
    }

    fn parse_top(&mut self) -> FedResult<Top> {
        self.expect_keyword("TOP")?;
        self.expect_token(&Token::LParen)?;
        let quantity = Some(self.parse_expr()?);
        self.expect_token(&Token::RParen)?;
        let percent = self.consume_keyword("PERCENT");
        let with_ties = if self.consume_keyword("WITH") {
            self.expect_keyword("TIES")?;
            true
        } else {
            false
        };
        Ok(Top { with_ties, percent, quantity })
    }

    fn parse_select_item(&mut self) -> FedResult<SelectItem> {
        if matches!(self.peek(), Token::Mul) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }
        let expr = self.parse_expr()?;
        if self.consume_keyword("AS") {
            let alias = self.parse_identifier()?;
            return Ok(SelectItem::ExprWithAlias { expr, alias });
        }
        if let Token::Word(w) = self.peek() {
            if w.quote_style.is_some() || !is_reserved_follow_keyword(&w.value) {
                let alias = self.parse_identifier()?;
                return Ok(SelectItem::ExprWithAlias { expr, alias });
            }
        }
        Ok(SelectItem::UnnamedExpr(expr))
    }

    fn parse_table_with_joins(&mut self) -> FedResult<TableWithJoins> {
        let relation = self.parse_table_factor()?;
        let mut joins = Vec::new();
        loop {
            let natural = self.consume_keyword("NATURAL");
            let join_operator = if self.consume_keyword("CROSS") {
                self.expect_keyword("JOIN")?;
                Some(JoinOperator::CrossJoin)
            } else if self.consume_keyword("JOIN") || self.consume_keyword("INNER") {
                if self.peek_is_keyword("JOIN") {
                    self.advance();
                }
                Some(JoinOperator::Inner(JoinConstraint::None))
            } else if self.consume_keyword("LEFT") {
                self.consume_keyword("OUTER");
                self.expect_keyword("JOIN")?;
                Some(JoinOperator::LeftOuter(JoinConstraint::None))
            } else if self.consume_keyword("RIGHT") {
                self.consume_keyword("OUTER");
                self.expect_keyword("JOIN")?;
                Some(JoinOperator::RightOuter(JoinConstraint::None))
            } else if self.consume_keyword("FULL") {
                self.consume_keyword("OUTER");
                self.expect_keyword("JOIN")?;
                Some(JoinOperator::FullOuter(JoinConstraint::None))
            } else {
                None
            };
            let Some(mut join_operator) = join_operator else {
                break;
            };
            let join_relation = self.parse_table_factor()?;
            let constraint = if natural {
                JoinConstraint::Natural
            } else if self.consume_keyword("ON") {
                JoinConstraint::On(self.parse_expr()?)
            } else if self.consume_keyword("USING") {
                self.expect_token(&Token::LParen)?;
                let cols = self.parse_comma_separated(Self::parse_identifier)?;
                self.expect_token(&Token::RParen)?;
                JoinConstraint::Using(cols)
            } else {
                JoinConstraint::None
            };
            join_operator = match join_operator {
                JoinOperator::Inner(_) => JoinOperator::Inner(constraint),
                JoinOperator::LeftOuter(_) => JoinOperator::LeftOuter(constraint),
                JoinOperator::RightOuter(_) => JoinOperator::RightOuter(constraint),
                JoinOperator::FullOuter(_) => JoinOperator::FullOuter(constraint),
                other => other,
            };
            joins.push(Join { relation: join_relation, join_operator });
        }
        Ok(TableWithJoins { relation, joins })
    }

    fn parse_table_factor(&mut self) -> FedResult<TableFactor> {
        let lateral = self.consume_keyword("LATERAL");
        if self.consume_token(&Token::LParen) {
            if self.peek_is_keyword("SELECT") || self.peek_is_keyword("WITH") || self.peek_is_keyword("VALUES") {
                let subquery = Box::new(self.parse_query()?);
                self.expect_token(&Token::RParen)?;
                let alias = self.parse_optional_table_alias()?;
                return Ok(TableFactor::Derived { lateral, subquery, alias });
            }
            let table = self.parse_table_with_joins()?;
            self.expect_token(&Token::RParen)?;
            return Ok(TableFactor::NestedJoin(Box::new(table)));
        }
        let name = self.parse_object_name()?;
        let alias = self.parse_optional_table_alias()?;
        Ok(TableFactor::Table { name, alias, args: None, with_hints: Vec::new() })
    }

    fn parse_optional_table_alias(&mut self) -> FedResult<Option<TableAlias>> {
        let explicit = self.consume_keyword("AS");
        if let Token::Word(w) = self.peek() {
            if explicit || (w.quote_style.is_some() || !is_reserved_follow_keyword(&w.value)) {
                let name = self.parse_identifier()?;
                let columns = if self.consume_token(&Token::LParen) {
                    let cols = self.parse_comma_separated(Self::parse_identifier)?;
                    self.expect_token(&Token::RParen)?;
                    cols
                } else {
                    Vec::new()
                };
                return Ok(Some(TableAlias { name, columns }));
            }
        }
        if explicit {
            return Err(self.error("expected alias after AS", vec!["identifier".to_string()]));
        }
        Ok(None)
    }

    // ---- Expressions (Pratt parser) ----

    fn parse_expr(&mut self) -> FedResult<Expr> {
        self.parse_subexpr(0)
    }

    fn parse_subexpr(&mut self, min_precedence: u8) -> FedResult<Expr> {
        let mut expr = self.parse_prefix()?;
        loop {
            let precedence = self.next_precedence();
            if precedence <= min_precedence {
                break;
            }
            expr = self.parse_infix(expr, precedence)?;
        }
        Ok(expr)
    }

    fn next_precedence(&self) -> u8 {
        match self.peek() {
            Token::Word(w) if w.is_keyword("OR") => 5,
            Token::Word(w) if w.is_keyword("AND") => 10,
            Token::Word(w) if w.is_keyword("NOT") => 0, // handled in prefix/postfix contexts
            Token::Word(w) if w.is_keyword("BETWEEN") => 20,
            Token::Word(w) if w.is_keyword("IN") => 20,
            Token::Word(w) if w.is_keyword("LIKE") || w.is_keyword("ILIKE") => 20,
            Token::Word(w) if w.is_keyword("IS") => 20,
            Token::Eq | Token::NotEq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => 20,
            Token::StringConcat => 30,
            Token::Plus | Token::Minus => 30,
            Token::Mul | Token::Div | Token::Mod => 40,
            _ => 0,
        }
    }

    fn parse_infix(&mut self, left: Expr, precedence: u8) -> FedResult<Expr> {
        if self.consume_keyword("AND") {
            return Ok(Expr::BinaryOp { left: Box::new(left), op: BinaryOperator::And, right: Box::new(self.parse_subexpr(precedence)?) });
        }
        if self.consume_keyword("OR") {
            return Ok(Expr::BinaryOp { left: Box::new(left), op: BinaryOperator::Or, right: Box::new(self.parse_subexpr(precedence)?) });
        }
        if self.peek_is_keyword("NOT") || self.peek_is_keyword("BETWEEN") {
            let negated = self.consume_keyword("NOT");
            if self.consume_keyword("BETWEEN") {
                let low = self.parse_subexpr(30)?;
                self.expect_keyword("AND")?;
                let high = self.parse_subexpr(30)?;
                return Ok(Expr::Between { expr: Box::new(left), negated, low: Box::new(low), high: Box::new(high) });
            }
            if self.consume_keyword("IN") {
                return self.parse_in(left, negated);
            }
            if self.consume_any_keyword(&["LIKE", "ILIKE"]).is_some() {
                let op = if negated { BinaryOperator::NotLike } else { BinaryOperator::Like };
                return Ok(Expr::BinaryOp { left: Box::new(left), op, right: Box::new(self.parse_subexpr(precedence)?) });
            }
            return Err(self.error("expected BETWEEN, IN or LIKE after NOT", vec!["BETWEEN".to_string(), "IN".to_string(), "LIKE".to_string()]));
        }
        if self.consume_keyword("IN") {
            return self.parse_in(left, false);
        }
        if self.consume_keyword("LIKE") {
            return Ok(Expr::BinaryOp { left: Box::new(left), op: BinaryOperator::Like, right: Box::new(self.parse_subexpr(precedence)?) });
        }
        if self.consume_keyword("ILIKE") {
            return Ok(Expr::BinaryOp { left: Box::new(left), op: BinaryOperator::ILike, right: Box::new(self.parse_subexpr(precedence)?) });
        }
        if self.consume_keyword("IS") {
            let negated = self.consume_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(if negated { Expr::IsNotNull(Box::new(left)) } else { Expr::IsNull(Box::new(left)) });
        }
        let op = match self.advance() {
            Token::Eq => BinaryOperator::Eq,
            Token::NotEq => BinaryOperator::NotEq,
            Token::Lt => BinaryOperator::Lt,
            Token::Gt => BinaryOperator::Gt,
            Token::LtEq => BinaryOperator::LtEq,
            Token::GtEq => BinaryOperator::GtEq,
            Token::Plus => BinaryOperator::Plus,
            Token::Minus => BinaryOperator::Minus,
            Token::Mul => BinaryOperator::Multiply,
            Token::Div => BinaryOperator::Divide,
            Token::Mod => BinaryOperator::Modulo,
            Token::StringConcat => BinaryOperator::Concat,
            other => return Err(self.error(format!("unexpected infix token {other:?}"), vec![])),
        };
        let right = self.parse_subexpr(precedence)?;
        Ok(Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) })
    }

    fn parse_in(&mut self, left: Expr, negated: bool) -> FedResult<Expr> {
        self.expect_token(&Token::LParen)?;
        if self.peek_is_keyword("SELECT") || matches!(self.peek(), Token::LParen) {
            let query = self.parse_query()?;
            self.expect_token(&Token::RParen)?;
            return Ok(Expr::InSubquery { expr: Box::new(left), subquery: Box::new(query), negated });
        }
        let list = self.parse_comma_separated(Self::parse_expr)?;
        self.expect_token(&Token::RParen)?;
        Ok(Expr::InList { expr: Box::new(left), list, negated })
    }

    fn parse_prefix(&mut self) -> FedResult<Expr> {
        if self.consume_keyword("NOT") {
            return Ok(Expr::UnaryOp { op: UnaryOperator::Not, expr: Box::new(self.parse_subexpr(15)?) });
        }
        if matches!(self.peek(), Token::Plus) {
            self.advance();
            return Ok(Expr::UnaryOp { op: UnaryOperator::Plus, expr: Box::new(self.parse_subexpr(45)?) });
        }
        if matches!(self.peek(), Token::Minus) {
            self.advance();
            return Ok(Expr::UnaryOp { op: UnaryOperator::Minus, expr: Box::new(self.parse_subexpr(45)?) });
        }
        if self.consume_keyword("EXISTS") {
            self.expect_token(&Token::LParen)?;
            let query = self.parse_query()?;
            self.expect_token(&Token::RParen)?;
            return Ok(Expr::Exists { subquery: Box::new(query), negated: false });
        }
        if self.consume_keyword("CASE") {
            return self.parse_case();
        }
        if self.consume_keyword("CAST") {
            self.expect_token(&Token::LParen)?;
            let expr = self.parse_expr()?;
            self.expect_keyword("AS")?;
            let data_type = self.parse_data_type()?;
            self.expect_token(&Token::RParen)?;
            return Ok(Expr::Cast { expr: Box::new(expr), data_type });
        }
        if self.consume_keyword("TRIM") {
            return self.parse_trim();
        }
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                if self.peek_is_keyword("SELECT") || self.peek_is_keyword("WITH") || self.peek_is_keyword("VALUES") {
                    let query = self.parse_query()?;
                    self.expect_token(&Token::RParen)?;
                    return Ok(Expr::Subquery(Box::new(query)));
                }
                let expr = self.parse_expr()?;
                self.expect_token(&Token::RParen)?;
                Ok(Expr::Nested(Box::new(expr)))
            }
            Token::Mul => {
                self.advance();
                Ok(Expr::Wildcard)
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Value(Value::Number(n, false)))
            }
            Token::SingleQuotedString(s) => {
                self.advance();
                Ok(Expr::Value(Value::SingleQuotedString(s)))
            }
            Token::NationalStringLiteral(s) => {
                self.advance();
                Ok(Expr::Value(Value::NationalStringLiteral(s)))
            }
            Token::HexStringLiteral(s) => {
                self.advance();
                Ok(Expr::Value(Value::HexStringLiteral(s)))
            }
            Token::Placeholder(p) => {
                self.advance();
                Ok(Expr::Value(Value::Placeholder(p)))
            }
            Token::Word(w) if w.is_keyword("NULL") => {
                self.advance();
                Ok(Expr::Value(Value::Null))
            }
            Token::Word(w) if w.is_keyword("TRUE") => {
                self.advance();
                Ok(Expr::Value(Value::Boolean(true)))
            }
            Token::Word(w) if w.is_keyword("FALSE") => {
                self.advance();
                Ok(Expr::Value(Value::Boolean(false)))
            }
            Token::Word(_) => self.parse_identifier_or_function_expr(),
            other => Err(self.error(format!("unexpected token {other:?} in expression"), vec![])),
        }
    }

    fn parse_identifier_or_function_expr(&mut self) -> FedResult<Expr> {
        let mut parts = vec![self.parse_identifier()?];
        while self.consume_token(&Token::Period) {
            if matches!(self.peek(), Token::Mul) {
                self.advance();
                return Ok(Expr::QualifiedWildcard(ObjectName(parts)));
            }
            parts.push(self.parse_identifier()?);
        }
        if matches!(self.peek(), Token::LParen) {
            self.advance();
            let distinct = self.consume_keyword("DISTINCT");
            let args = if matches!(self.peek(), Token::RParen) {
                Vec::new()
            } else if matches!(self.peek(), Token::Mul) {
                self.advance();
                vec![FunctionArg::Unnamed(Expr::Wildcard)]
            } else {
                self.parse_comma_separated(Self::parse_function_arg)?
            };
            self.expect_token(&Token::RParen)?;
            return Ok(Expr::Function(Function { name: ObjectName(parts), args, distinct }));
        }
        if parts.len() == 1 {
            Ok(Expr::Identifier(parts.pop().expect("len checked")))
        } else {
            Ok(Expr::CompoundIdentifier(parts))
        }
    }

    fn parse_function_arg(&mut self) -> FedResult<FunctionArg> {
        Ok(FunctionArg::Unnamed(self.parse_expr()?))
    }

    fn parse_case(&mut self) -> FedResult<Expr> {
        let operand = if self.peek_is_keyword("WHEN") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let mut conditions = Vec::new();
        let mut results = Vec::new();
        self.expect_keyword("WHEN")?;
        conditions.push(self.parse_expr()?);
        self.expect_keyword("THEN")?;
        results.push(self.parse_expr()?);
        while self.consume_keyword("WHEN") {
            conditions.push(self.parse_expr()?);
            self.expect_keyword("THEN")?;
            results.push(self.parse_expr()?);
        }
        let else_result = if self.consume_keyword("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_keyword("END")?;
        Ok(Expr::Case { operand, conditions, results, else_result })
    }

    fn parse_trim(&mut self) -> FedResult<Expr> {
        self.expect_token(&Token::LParen)?;
        let trim_where = if self.consume_keyword("BOTH") {
            Some(TrimWhereField::Both)
        } else if self.consume_keyword("LEADING") {
            Some(TrimWhereField::Leading)
        } else if self.consume_keyword("TRAILING") {
            Some(TrimWhereField::Trailing)
        } else {
            None
        };
        let trim_what = if trim_where.is_some() && !self.peek_is_keyword("FROM") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        if trim_where.is_some() {
            self.expect_keyword("FROM")?;
        }
        let expr = Box::new(self.parse_expr()?);
        self.expect_token(&Token::RParen)?;
        Ok(Expr::Trim { expr, trim_where, trim_what })
    }

    fn parse_data_type(&mut self) -> FedResult<String> {
        let mut name = match self.advance() {
            Token::Word(w) => w.value,
            other => return Err(self.error(format!("expected a type name, found {other:?}"), vec![])),
        };
        if self.consume_token(&Token::LParen) {
            name.push('(');
            let args = self.parse_comma_separated(|p| match p.advance() {
                Token::Number(n) => Ok(n),
                other => Err(p.error(format!("expected a numeric type argument, found {other:?}"), vec![])),
            })?;
            name.push_str(&args.join(", "));
            self.expect_token(&Token::RParen)?;
            name.push(')');
        }
        Ok(name)
    }

    fn parse_identifier(&mut self) -> FedResult<Ident> {
        let position = self.peek_position();
        match self.advance() {
            Token::Word(Word { value, quote_style }) => Ok(Ident { value, quote_style, position }),
            other => Err(FedError::syntax(
                format!("expected an identifier, found {other:?}"),
                position,
                vec!["identifier".to_string()],
            )),
        }
    }

    fn parse_object_name(&mut self) -> FedResult<ObjectName> {
        let mut parts = vec![self.parse_identifier()?];
        while self.consume_token(&Token::Period) {
            parts.push(self.parse_identifier()?);
        }
        Ok(ObjectName(parts))
    }

    fn parse_comma_separated<T>(&mut self, mut parse_one: impl FnMut(&mut Self) -> FedResult<T>) -> FedResult<Vec<T>> {
        let mut items = vec![parse_one(self)?];
        while self.consume_token(&Token::Comma) {
            items.push(parse_one(self)?);
        }
        Ok(items)
    }
}

/// Keywords that terminate an implicit (`AS`-less) alias instead of being
/// consumed as one, e.g. `FROM t WHERE ...` must not treat `WHERE` as `t`'s
/// alias.
fn is_reserved_follow_keyword(word: &str) -> bool {
    const RESERVED: &[&str] = &[
        "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "FETCH", "UNION",
        "EXCEPT", "INTERSECT", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL",
        "ON", "USING", "FOR", "AND", "OR", "AS",
    ];
    RESERVED.iter().any(|k| word.eq_ignore_ascii_case(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn parse_ansi(sql: &str) -> Statement {
        parse(sql, &Dialect::ansi()).unwrap()
    }

    #[test]
    fn parses_simple_select() {
        let stmt = parse_ansi("SELECT a, b FROM t WHERE a = 1");
        match stmt {
            Statement::Query(q) => match *q.body {
                SetExpr::Select(s) => {
                    assert_eq!(s.projection.len(), 2);
                    assert!(s.selection.is_some());
                }
                _ => panic!("expected select"),
            },
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn parses_show_tables_with_all_clauses() {
        let stmt = parse_ansi("SHOW TABLES FROM sales LIKE 'ord%' WHERE col_count > 3");
        match stmt {
            Statement::ShowTables(s) => {
                assert_eq!(s.db.unwrap().value, "sales");
                assert_eq!(s.like_pattern.unwrap(), "ord%");
                assert!(s.filter.is_some());
            }
            _ => panic!("expected SHOW TABLES"),
        }
    }

    #[test]
    fn parses_use_schema() {
        let stmt = parse_ansi("USE reporting");
        assert!(matches!(stmt, Statement::Use(u) if u.name.value == "reporting"));
    }

    #[test]
    fn rejects_trailing_garbage_with_position() {
        let err = parse("SELECT 1 GARBAGE", &Dialect::ansi()).unwrap_err();
        assert!(matches!(err, FedError::Syntax { .. }));
    }

    #[test]
    fn parses_join_with_on_clause() {
        let stmt = parse_ansi("SELECT * FROM a JOIN b ON a.id = b.a_id");
        match stmt {
            Statement::Query(q) => match *q.body {
                SetExpr::Select(s) => {
                    assert_eq!(s.from[0].joins.len(), 1);
                    assert!(matches!(
                        &s.from[0].joins[0].join_operator,
                        JoinOperator::Inner(JoinConstraint::On(_))
                    ));
                }
                _ => panic!("expected select"),
            },
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn parses_pagination_clauses() {
        let stmt = parse_ansi("SELECT * FROM t LIMIT 10 OFFSET 5");
        match stmt {
            Statement::Query(q) => {
                assert!(q.limit.is_some());
                assert!(q.offset.is_some());
            }
            _ => panic!("expected query"),
        }
    }
}
