//! Hand-written lexer. Tracks 1-based line/column so every node can carry
//! a source position, and preserves comments as trivia attached to the
//! position of the token that follows them.

use crate::ast::{Comment, Position};
use crate::error::FedError;

use super::token::{Token, Word};

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            input,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Tokenizes the whole input, returning the token stream (with a
    /// trailing `Token::Eof`) and any comments encountered, each attached to
    /// the position of the token immediately following it.
    pub fn tokenize(mut self) -> Result<(Vec<(Token, Position)>, Vec<Comment>), FedError> {
        let mut tokens = Vec::new();
        let mut comments = Vec::new();
        loop {
            self.skip_whitespace();
            let attach_at = self.position();
            if let Some(text) = self.try_consume_comment()? {
                comments.push(Comment {
                    text,
                    attached_to: attach_at,
                });
                continue;
            }
            let start = self.position();
            match self.peek() {
                None => {
                    tokens.push((Token::Eof, start));
                    break;
                }
                Some(c) => {
                    let token = self.next_token(c, start)?;
                    tokens.push((token, start));
                }
            }
        }
        Ok((tokens, comments))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn try_consume_comment(&mut self) -> Result<Option<String>, FedError> {
        if self.peek() == Some('-') && self.peek_at(1) == Some('-') {
            self.advance();
            self.advance();
            let mut text = String::new();
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                text.push(c);
                self.advance();
            }
            return Ok(Some(text));
        }
        if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            self.advance();
            self.advance();
            let mut text = String::new();
            loop {
                match (self.peek(), self.peek_at(1)) {
                    (Some('*'), Some('/')) => {
                        self.advance();
                        self.advance();
                        break;
                    }
                    (Some(_), _) => {
                        text.push(self.advance().expect("peek confirmed Some"));
                    }
                    (None, _) => {
                        return Err(FedError::syntax(
                            "unterminated block comment",
                            self.position(),
                            vec!["*/".to_string()],
                        ));
                    }
                }
            }
            return Ok(Some(text));
        }
        Ok(None)
    }

    fn next_token(&mut self, c: char, start: Position) -> Result<Token, FedError> {
        match c {
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '.' if !matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => {
                self.advance();
                Ok(Token::Period)
            }
            ';' => {
                self.advance();
                Ok(Token::Semicolon)
            }
            '=' => {
                self.advance();
                Ok(Token::Eq)
            }
            '<' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::LtEq)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::NotEq)
                    }
                    _ => Ok(Token::Lt),
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::GtEq)
                } else {
                    Ok(Token::Gt)
                }
            }
            '!' if self.peek_at(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(Token::NotEq)
            }
            '+' => {
                self.advance();
                Ok(Token::Plus)
            }
            '-' => {
                self.advance();
                Ok(Token::Minus)
            }
            '*' => {
                self.advance();
                Ok(Token::Mul)
            }
            '/' => {
                self.advance();
                Ok(Token::Div)
            }
            '%' => {
                self.advance();
                Ok(Token::Mod)
            }
            '|' if self.peek_at(1) == Some('|') => {
                self.advance();
                self.advance();
                Ok(Token::StringConcat)
            }
            '?' => {
                self.advance();
                Ok(Token::Placeholder("?".to_string()))
            }
            '$' if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => {
                let mut text = String::from("$");
                self.advance();
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    text.push(self.advance().expect("peek confirmed Some"));
                }
                Ok(Token::Placeholder(text))
            }
            '\'' => self.consume_single_quoted_string(),
            '"' => self.consume_quoted_word('"'),
            '`' => self.consume_quoted_word('`'),
            '[' => self.consume_quoted_word('['),
            'X' | 'x' if self.peek_at(1) == Some('\'') => self.consume_hex_string(),
            'N' | 'n' if self.peek_at(1) == Some('\'') => self.consume_national_string(),
            c if c.is_ascii_digit() || (c == '.' ) => self.consume_number(),
            c if is_ident_start(c) => Ok(Token::Word(self.consume_word())),
            other => Err(FedError::syntax(
                format!("unexpected character '{other}'"),
                start,
                vec![],
            )),
        }
    }

    fn consume_single_quoted_string(&mut self) -> Result<Token, FedError> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('\'') if self.peek_at(1) == Some('\'') => {
                    text.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => {
                    return Err(FedError::syntax(
                        "unterminated string literal",
                        self.position(),
                        vec!["'".to_string()],
                    ));
                }
            }
        }
        Ok(Token::SingleQuotedString(text))
    }

    fn consume_hex_string(&mut self) -> Result<Token, FedError> {
        self.advance();
        match self.consume_single_quoted_string()? {
            Token::SingleQuotedString(s) => Ok(Token::HexStringLiteral(s)),
            _ => unreachable!(),
        }
    }

    fn consume_national_string(&mut self) -> Result<Token, FedError> {
        self.advance();
        match self.consume_single_quoted_string()? {
            Token::SingleQuotedString(s) => Ok(Token::NationalStringLiteral(s)),
            _ => unreachable!(),
        }
    }

    fn consume_quoted_word(&mut self, quote: char) -> Result<Token, FedError> {
        let closing = match quote {
            '[' => ']',
            other => other,
        };
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(c) if c == closing && self.peek_at(1) == Some(closing) => {
                    text.push(closing);
                    self.advance();
                    self.advance();
                }
                Some(c) if c == closing => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => {
                    return Err(FedError::syntax(
                        format!("unterminated quoted identifier, expected '{closing}'"),
                        self.position(),
                        vec![closing.to_string()],
                    ));
                }
            }
        }
        Ok(Token::Word(Word {
            value: text,
            quote_style: Some(quote),
        }))
    }

    fn consume_number(&mut self) -> Result<Token, FedError> {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().expect("peek confirmed Some"));
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) {
            text.push(self.advance().expect("peek confirmed Some"));
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().expect("peek confirmed Some"));
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(lookahead), Some('+') | Some('-')) {
                lookahead += 1;
            }
            if matches!(self.peek_at(lookahead), Some(d) if d.is_ascii_digit()) {
                text.push(self.advance().expect("peek confirmed Some"));
                if matches!(self.peek(), Some('+') | Some('-')) {
                    text.push(self.advance().expect("peek confirmed Some"));
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    text.push(self.advance().expect("peek confirmed Some"));
                }
            }
        }
        Ok(Token::Number(text))
    }

    fn consume_word(&mut self) -> Word {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            text.push(self.advance().expect("peek confirmed Some"));
        }
        Word {
            value: text,
            quote_style: None,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_only(sql: &str) -> Vec<Token> {
        Lexer::new(sql)
            .tokenize()
            .unwrap()
            .0
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn tokenizes_select_with_mixed_operators() {
        let tokens = tokens_only("SELECT a, b FROM t WHERE a <> 1 AND b >= 2");
        assert!(tokens.iter().any(|t| matches!(t, Token::NotEq)));
        assert!(tokens.iter().any(|t| matches!(t, Token::GtEq)));
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }

    #[test]
    fn line_comment_attached_to_next_token_position() {
        let (_, comments) = Lexer::new("SELECT 1 -- trailing note\nFROM t").tokenize().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, " trailing note");
        assert_eq!(comments[0].attached_to.line, 2);
    }

    #[test]
    fn doubled_quote_inside_identifier_is_unescaped() {
        let tokens = tokens_only("SELECT \"a\"\"b\" FROM t");
        assert!(tokens.iter().any(|t| matches!(t, Token::Word(w) if w.value == "a\"b")));
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        let err = Lexer::new("SELECT 'abc").tokenize().unwrap_err();
        assert!(matches!(err, FedError::Syntax { .. }));
    }

    #[test]
    fn bracket_quoted_identifier_for_sqlserver() {
        let tokens = tokens_only("SELECT [my col] FROM t");
        assert!(tokens.iter().any(|t| matches!(t, Token::Word(w) if w.value == "my col" && w.quote_style == Some('['))));
    }
}
