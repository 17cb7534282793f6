//! Reader for encrypted DBF/CDX tables.
//!
//! Re-exports [`dbf_core`] (table sources, reader, normalization) and
//! [`dbf_filter`] (values, records, filters).

pub use dbf_core;
pub use dbf_filter;

pub mod prelude {
    pub use dbf_core::{
        Error, JsonlTableSource, MemoryTable, MemoryTableSource, RawValue, ReadOptions, ReadOrder,
        Result, SourceConfig, TableCursor, TableMetadata, TableReader, TableSource,
    };
    pub use dbf_filter::{Condition, FieldError, Filter, Operator, PushdownPolicy, Record, Value};
}
