use thiserror::Error;

/// Errors raised while building or evaluating filters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot parse '{value}' as a date (expected format {format})")]
    DateParse { value: String, format: &'static str },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("invalid filter expression: {0}")]
    Expression(String),
}

impl Error {
    /// Returns true if the error comes from a malformed date
    pub fn is_date_error(&self) -> bool {
        matches!(self, Error::DateParse { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
