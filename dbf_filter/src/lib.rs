//! Record values and filtering for DBF tables.
//!
//! [`Value`] and [`Record`] are the canonical shapes rows are normalized
//! into. [`Filter`]s are evaluated in memory with [`matches`], and the
//! [`pushdown`] module turns the same filters into provider expressions.

pub mod date;
pub mod error;
pub mod filter;
pub mod predicate;
pub mod pushdown;
pub mod record;
pub mod value;

pub use date::*;
pub use error::*;
pub use filter::*;
pub use predicate::*;
pub use pushdown::{Expression, FieldKind, PushdownPolicy, DEFAULT_PUSHDOWN_FIELD};
pub use record::*;
pub use value::*;
