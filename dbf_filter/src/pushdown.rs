//! Translation of typed filters into provider filter expressions.
//!
//! Only allowlisted fields are pushed, and every literal is rendered from a
//! validated value, so caller input never reaches the expression verbatim.
//! The grammar is deliberately small:
//!
//! ```text
//! expression := clause ("AND" clause)*
//! clause     := FIELD operator literal
//! literal    := '...' | number | DATE 'dd/mm/yyyy'
//! ```
//!
//! A `DATE` literal asks for a chronological comparison whatever the
//! column's storage type, matching a filter marked `is_date`.

use std::iter::Peekable;
use std::str::{Chars, FromStr};

use crate::date::{format_date, value_as_date};
use crate::error::{Error, Result};
use crate::filter::{Condition, Filter, Operator};
use crate::value::Value;

/// Field allowlisted for pushdown by default.
pub const DEFAULT_PUSHDOWN_FIELD: &str = "F_EMISION";

/// How an allowlisted field is compared by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Plain,
}

/// Allowlist of fields that may be pushed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushdownPolicy {
    fields: Vec<(String, FieldKind)>,
}

impl Default for PushdownPolicy {
    fn default() -> Self {
        Self::empty().allow(DEFAULT_PUSHDOWN_FIELD, FieldKind::Date)
    }
}

impl PushdownPolicy {
    /// A policy that pushes nothing.
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn allow(mut self, field: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((field.into(), kind));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Kind of `field` if it is allowlisted. Names match exactly, the same
    /// way [`crate::Record::get`] looks fields up.
    pub fn lookup(&self, field: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, kind)| *kind)
    }

    /// Compile every pushable filter into one expression. Filters that cannot
    /// be pushed are skipped; `None` means nothing was pushable.
    pub fn compile(&self, filters: &[Filter]) -> Option<String> {
        let clauses: Vec<String> = filters
            .iter()
            .filter_map(|filter| self.compile_filter(filter))
            .collect();
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }

    fn compile_filter(&self, filter: &Filter) -> Option<String> {
        let field = filter.field.as_str();
        let kind = self.lookup(field)?;
        if (kind == FieldKind::Date) != filter.is_date {
            return None;
        }
        match &filter.condition {
            Condition::Compare { operator, value } => {
                Some(format!("{field} {operator} {}", render_literal(value, kind)?))
            }
            Condition::Range { from, to } => Some(format!(
                "{field} >= {} AND {field} <= {}",
                render_literal(from, kind)?,
                render_literal(to, kind)?
            )),
        }
    }
}

fn render_literal(value: &Value, kind: FieldKind) -> Option<String> {
    if kind == FieldKind::Date {
        let date = value_as_date(value).ok()??;
        return Some(format!("DATE '{}'", format_date(date)));
    }
    match value {
        Value::Text(s) | Value::Date(s) => {
            if s.contains('\'') || s.chars().any(char::is_control) {
                None
            } else {
                Some(format!("'{s}'"))
            }
        }
        Value::Integer(i) => Some(i.to_string()),
        Value::Decimal(d) if d.is_finite() => Some(d.to_string()),
        _ => None,
    }
}

/// One parsed `FIELD op literal` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub operator: Operator,
    pub literal: Value,
    /// The literal was written as `DATE '...'`.
    pub is_date: bool,
}

/// A parsed pushdown expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    clauses: Vec<Clause>,
}

impl Expression {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut clauses = Vec::new();
        let mut tokens = tokens.into_iter();
        loop {
            let field = match tokens.next() {
                Some(Token::Ident(name)) => name,
                other => return Err(unexpected("field name", other)),
            };
            let operator = match tokens.next() {
                Some(Token::Op(op)) => op,
                other => return Err(unexpected("operator", other)),
            };
            let (literal, is_date) = match tokens.next() {
                Some(Token::Literal(value)) => (value, false),
                Some(Token::Ident(word)) if word.eq_ignore_ascii_case("DATE") => {
                    match tokens.next() {
                        Some(Token::Literal(value @ Value::Text(_))) => {
                            value_as_date(&value)?;
                            (value, true)
                        }
                        other => return Err(unexpected("date literal", other)),
                    }
                }
                other => return Err(unexpected("literal", other)),
            };
            clauses.push(Clause {
                field,
                operator,
                literal,
                is_date,
            });
            match tokens.next() {
                None => break,
                Some(Token::And) => continue,
                other => return Err(unexpected("AND", other)),
            }
        }
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Turn the clauses back into filters. Clauses with a `DATE` literal
    /// become date filters.
    pub fn to_filters(&self) -> Vec<Filter> {
        self.clauses
            .iter()
            .map(|clause| {
                let filter =
                    Filter::compare(clause.field.clone(), clause.operator, clause.literal.clone());
                if clause.is_date {
                    filter.dated()
                } else {
                    filter
                }
            })
            .collect()
    }
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Expression::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Op(Operator),
    Literal(Value),
    And,
}

fn unexpected(expected: &str, found: Option<Token>) -> Error {
    match found {
        Some(token) => Error::Expression(format!("expected {expected}, found {token:?}")),
        None => Error::Expression(format!("expected {expected}, found end of input")),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '\'' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(ch) => text.push(ch),
                    None => {
                        return Err(Error::Expression(
                            "unterminated string literal".to_string(),
                        ))
                    }
                }
            }
            tokens.push(Token::Literal(Value::Text(text)));
        } else if matches!(c, '=' | '<' | '>') {
            let symbol = take_while(&mut chars, |ch| matches!(ch, '=' | '<' | '>'));
            tokens.push(Token::Op(symbol.parse()?));
        } else if c.is_ascii_digit() || c == '-' || c == '.' {
            let number = take_while(&mut chars, |ch| {
                ch.is_ascii_digit() || matches!(ch, '-' | '.' | 'e' | 'E' | '+')
            });
            tokens.push(Token::Literal(parse_number(&number)?));
        } else if c.is_alphabetic() || c == '_' {
            let word = take_while(&mut chars, |ch| ch.is_alphanumeric() || ch == '_');
            if word.eq_ignore_ascii_case("AND") {
                tokens.push(Token::And);
            } else {
                tokens.push(Token::Ident(word));
            }
        } else {
            return Err(Error::Expression(format!("unexpected character '{c}'")));
        }
    }
    if tokens.is_empty() {
        return Err(Error::Expression("empty expression".to_string()));
    }
    Ok(tokens)
}

fn take_while(chars: &mut Peekable<Chars<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&ch) = chars.peek() {
        if !accept(ch) {
            break;
        }
        out.push(ch);
        chars.next();
    }
    out
}

fn parse_number(text: &str) -> Result<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    text.parse::<f64>()
        .map(Value::from)
        .map_err(|_| Error::Expression(format!("invalid number literal {text}")))
}
