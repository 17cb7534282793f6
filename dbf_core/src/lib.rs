//! Reading DBF/CDX tables into normalized, filtered records.
//!
//! A [`TableReader`] drives a [`TableSource`] provider: it opens a cursor,
//! pushes what it can of the filters down to the provider, normalizes every
//! row into a [`Record`] and evaluates the filters in memory.

mod const_vars;
pub mod config;
pub mod error;
pub mod normalize;
pub mod reader;
pub mod source;

pub use config::*;
pub use const_vars::*;
pub use error::*;
pub use normalize::*;
pub use reader::*;
pub use source::*;

pub use dbf_filter::{
    Condition, FieldError, FieldKind, Filter, Operator, PushdownPolicy, Record, Value,
};
