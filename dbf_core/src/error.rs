use thiserror::Error;

/// The main error type for the DBF core library.
/// This enum represents all possible errors that can occur while opening,
/// iterating and filtering tables.
#[derive(Debug, Error)]
pub enum Error {
    // Table source errors
    #[error("Table source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Unsupported pushdown filter: {0}")]
    UnsupportedFilter(String),

    #[error("Malformed row at line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    // Value errors
    #[error("Cannot convert value of {field}: {message}")]
    ValueConversion { field: String, message: String },

    // Filter errors
    #[error("Filter error: {0}")]
    Filter(#[from] dbf_filter::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO and serialization errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the table source could not be opened or read
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable(_) | Error::MalformedRow { .. } | Error::IoError(_)
        )
    }

    /// Returns true if the error comes from a filter definition or evaluation
    pub fn is_filter_error(&self) -> bool {
        matches!(self, Error::Filter(_) | Error::UnsupportedFilter(_))
    }

    /// Returns true if a date failed to parse
    pub fn is_date_error(&self) -> bool {
        matches!(self, Error::Filter(e) if e.is_date_error())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
