//! Literal parsing for the right-hand side of text predicates.
//!
//! Fragments such as `42`, `'alice'`, `[1, 2, 3]` or `{'lang': 'en'}` are turned
//! into [`Bson`] values by a small recursive-descent parser. The grammar only
//! knows literals:
//!
//! - integers (`42`, `-7`, `1_000`, `0xff`, `0o17`, `0b101`) and floats (`1.5`, `.5`, `2e10`)
//! - single- or double-quoted strings with the usual backslash escapes
//! - `True`/`true`, `False`/`false`, `None`/`null`
//! - sequences: lists `[..]`, tuples `(..)` and sets `{..}`, all stored as arrays
//! - mappings with string keys `{'k': v}`, stored as documents
//!
//! Anything else (names, calls, attribute access, arithmetic) is rejected with a
//! [`LiteralError`]. Nothing in a fragment is ever evaluated.
//!
//! # Example
//!
//! ```ignore
//! use docquery_core::literal::parse_literal;
//! use bson::{Bson, bson};
//!
//! assert_eq!(parse_literal("[1, 'two']").unwrap(), bson!([1, "two"]));
//! assert!(parse_literal("__import__('os')").is_err());
//! ```

use bson::{Bson, Document};
use thiserror::Error;

/// Maximum nesting of sequences and mappings inside one fragment.
pub const MAX_DEPTH: usize = 64;

/// The reason a fragment was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralErrorKind {
    #[error("empty literal")]
    Empty,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unknown name {0:?}, only literals are allowed")]
    UnknownName(String),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("integer {0} does not fit in 64 bits")]
    IntegerOverflow(String),
    #[error("mapping keys must be strings")]
    NonStringKey,
    #[error("nesting deeper than {} levels", MAX_DEPTH)]
    TooDeep,
    #[error("trailing input after literal")]
    TrailingInput,
}

/// A fragment that is not a literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset} in {fragment:?}")]
pub struct LiteralError {
    /// The complete fragment that was being parsed.
    pub fragment: String,
    /// Byte offset where parsing stopped.
    pub offset: usize,
    /// What went wrong.
    pub kind: LiteralErrorKind,
}

/// Parses a single literal, ignoring surrounding whitespace.
pub fn parse_literal(input: &str) -> Result<Bson, LiteralError> {
    LiteralParser::new(input).parse()
}

struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

type ParseResult<T> = Result<T, LiteralError>;

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0, depth: 0 }
    }

    fn parse(mut self) -> ParseResult<Bson> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error(LiteralErrorKind::Empty));
        }

        let value = self.value()?;

        self.skip_whitespace();
        if self.peek().is_some() {
            return Err(self.error(LiteralErrorKind::TrailingInput));
        }

        Ok(value)
    }

    fn error(&self, kind: LiteralErrorKind) -> LiteralError {
        self.error_at(self.pos, kind)
    }

    fn error_at(&self, offset: usize, kind: LiteralErrorKind) -> LiteralError {
        LiteralError { fragment: self.input.to_string(), offset, kind }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(LiteralErrorKind::UnexpectedChar(c))),
            None => Err(self.error(LiteralErrorKind::UnexpectedEnd)),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(LiteralErrorKind::TooDeep));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;

        result
    }

    fn value(&mut self) -> ParseResult<Bson> {
        self.skip_whitespace();

        match self.peek() {
            None => Err(self.error(LiteralErrorKind::UnexpectedEnd)),
            Some('[') => self.nested(Self::list),
            Some('(') => self.nested(Self::tuple),
            Some('{') => self.nested(Self::braced),
            Some('\'') | Some('"') => self.string().map(Bson::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '.' | '+' | '-') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(c) => Err(self.error(LiteralErrorKind::UnexpectedChar(c))),
        }
    }

    fn list(&mut self) -> ParseResult<Bson> {
        self.expect('[')?;

        Ok(Bson::Array(self.sequence_tail(Vec::new(), ']')?))
    }

    fn tuple(&mut self) -> ParseResult<Bson> {
        self.expect('(')?;
        self.skip_whitespace();

        if self.peek() == Some(')') {
            self.bump();
            return Ok(Bson::Array(Vec::new()));
        }

        let first = self.value()?;
        self.skip_whitespace();

        match self.peek() {
            // `(x)` only groups, `(x,)` is a one-element tuple
            Some(')') => {
                self.bump();
                Ok(first)
            }
            Some(',') => {
                self.bump();
                Ok(Bson::Array(self.sequence_tail(vec![first], ')')?))
            }
            Some(c) => Err(self.error(LiteralErrorKind::UnexpectedChar(c))),
            None => Err(self.error(LiteralErrorKind::UnexpectedEnd)),
        }
    }

    fn braced(&mut self) -> ParseResult<Bson> {
        self.expect('{')?;
        self.skip_whitespace();

        if self.peek() == Some('}') {
            self.bump();
            return Ok(Bson::Document(Document::new()));
        }

        let key_start = self.pos;
        let first = self.value()?;
        self.skip_whitespace();

        if self.peek() == Some(':') {
            return self.mapping_tail(key_start, first).map(Bson::Document);
        }

        match self.peek() {
            Some(',') => {
                self.bump();
            }
            Some('}') => {}
            Some(c) => return Err(self.error(LiteralErrorKind::UnexpectedChar(c))),
            None => return Err(self.error(LiteralErrorKind::UnexpectedEnd)),
        }

        let items = self.sequence_tail(vec![first], '}')?;
        let mut unique: Vec<Bson> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }

        Ok(Bson::Array(unique))
    }

    /// Parses comma separated values up to and including `close`.
    /// The opening delimiter and any items in `items` are already consumed.
    fn sequence_tail(&mut self, mut items: Vec<Bson>, close: char) -> ParseResult<Vec<Bson>> {
        loop {
            self.skip_whitespace();

            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }

            items.push(self.value()?);
            self.skip_whitespace();

            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(c) => return Err(self.error(LiteralErrorKind::UnexpectedChar(c))),
                None => return Err(self.error(LiteralErrorKind::UnexpectedEnd)),
            }
        }
    }

    fn mapping_tail(&mut self, first_key_start: usize, first_key: Bson) -> ParseResult<Document> {
        let mut document = Document::new();
        let (mut key_start, mut key) = (first_key_start, first_key);

        loop {
            let Bson::String(name) = key else {
                return Err(self.error_at(key_start, LiteralErrorKind::NonStringKey));
            };

            self.expect(':')?;
            let value = self.value()?;
            document.insert(name, value);
            self.skip_whitespace();

            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(document);
                }
                Some(c) => return Err(self.error(LiteralErrorKind::UnexpectedChar(c))),
                None => return Err(self.error(LiteralErrorKind::UnexpectedEnd)),
            }

            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(document);
            }

            key_start = self.pos;
            key = self.value()?;
            self.skip_whitespace();
        }
    }

    fn string(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error(LiteralErrorKind::UnexpectedEnd))?;
        let mut out = String::new();

        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error_at(start, LiteralErrorKind::UnterminatedString));
                }
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape(start)?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, string_start: usize) -> ParseResult<char> {
        let escape_start = self.pos - 1;

        match self.bump() {
            None => Err(self.error_at(string_start, LiteralErrorKind::UnterminatedString)),
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('0') => Ok('\0'),
            Some('x') => self.hex_escape(escape_start, 2),
            Some('u') => self.hex_escape(escape_start, 4),
            Some(_) => Err(self.error_at(escape_start, LiteralErrorKind::InvalidEscape)),
        }
    }

    fn hex_escape(&mut self, escape_start: usize, len: usize) -> ParseResult<char> {
        let mut code = 0u32;

        for _ in 0..len {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error_at(escape_start, LiteralErrorKind::InvalidEscape))?;
            code = code * 16 + digit;
        }

        char::from_u32(code).ok_or_else(|| self.error_at(escape_start, LiteralErrorKind::InvalidEscape))
    }

    /// Consumes digits of `radix`, allowing single `_` separators between digits.
    /// Returns the digits without separators.
    fn digits(&mut self, radix: u32) -> String {
        let mut out = String::new();

        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                out.push(c);
                self.bump();
            } else if c == '_'
                && !out.is_empty()
                && self.peek_second().is_some_and(|next| next.is_digit(radix))
            {
                self.bump();
            } else {
                break;
            }
        }

        out
    }

    fn number(&mut self) -> ParseResult<Bson> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        let radix = match (self.peek(), self.peek_second()) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.bump();
            self.bump();
            let digits = self.digits(radix);
            if digits.is_empty() {
                return Err(self.invalid_number(start));
            }
            return self.integer(start, negative, &digits, radix);
        }

        let whole = self.digits(10);
        let mut fraction = None;
        let mut exponent = None;

        if self.peek() == Some('.') {
            self.bump();
            fraction = Some(self.digits(10));
        }

        if whole.is_empty() && fraction.as_deref().is_none_or(str::is_empty) {
            return Err(self.invalid_number(start));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            let exp_negative = match self.peek() {
                Some('-') => {
                    self.bump();
                    true
                }
                Some('+') => {
                    self.bump();
                    false
                }
                _ => false,
            };
            let digits = self.digits(10);
            if digits.is_empty() {
                return Err(self.invalid_number(start));
            }
            exponent = Some((exp_negative, digits));
        }

        if fraction.is_none() && exponent.is_none() {
            return self.integer(start, negative, &whole, 10);
        }

        let mut text = String::new();
        if negative {
            text.push('-');
        }
        text.push_str(if whole.is_empty() { "0" } else { &whole });
        if let Some(fraction) = fraction.filter(|f| !f.is_empty()) {
            text.push('.');
            text.push_str(&fraction);
        }
        if let Some((exp_negative, digits)) = exponent {
            text.push('e');
            if exp_negative {
                text.push('-');
            }
            text.push_str(&digits);
        }

        text.parse::<f64>()
            .map(Bson::Double)
            .map_err(|_| self.invalid_number(start))
    }

    fn integer(&self, start: usize, negative: bool, digits: &str, radix: u32) -> ParseResult<Bson> {
        let raw = &self.input[start..self.pos];
        let overflow = || self.error_at(start, LiteralErrorKind::IntegerOverflow(raw.to_string()));

        let magnitude = i128::from_str_radix(digits, radix).map_err(|_| overflow())?;
        let value = i64::try_from(if negative { -magnitude } else { magnitude }).map_err(|_| overflow())?;

        Ok(match i32::try_from(value) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(value),
        })
    }

    fn invalid_number(&self, start: usize) -> LiteralError {
        let end = self.pos.max(start + 1).min(self.input.len());
        self.error_at(
            start,
            LiteralErrorKind::InvalidNumber(self.input[start..end].to_string()),
        )
    }

    fn name(&mut self) -> ParseResult<Bson> {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }

        match &self.input[start..self.pos] {
            "True" | "true" => Ok(Bson::Boolean(true)),
            "False" | "false" => Ok(Bson::Boolean(false)),
            "None" | "null" => Ok(Bson::Null),
            other => Err(self.error_at(start, LiteralErrorKind::UnknownName(other.to_string()))),
        }
    }
}
