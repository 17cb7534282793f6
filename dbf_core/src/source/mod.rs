//! Table source providers.
//!
//! A [`TableSource`] opens tables by name and hands out forward-only
//! [`TableCursor`]s. The proprietary engine sits behind these traits; the
//! crate ships an in-memory provider and a plaintext JSONL export provider.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use dbf_filter::{Expression, Filter};
use tracing::warn;

use crate::error::{Error, Result};

pub mod jsonl;
pub mod memory;

pub use jsonl::{ColumnDef, ColumnType, JsonlCursor, JsonlTableSource};
pub use memory::{MemoryCursor, MemoryTable, MemoryTableSource};

/// Provider values that are not primitives but can render themselves as text.
pub trait AsText: fmt::Debug + Send + Sync {
    fn as_text(&self) -> Result<String>;
}

/// A field value as the provider returns it, before normalization.
#[derive(Debug, Clone)]
pub enum RawValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Logical(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Object(Arc<dyn AsText>),
}

impl RawValue {
    pub fn is_date(&self) -> bool {
        matches!(self, RawValue::Date(_) | RawValue::DateTime(_))
    }
}

/// Opens tables by identifier.
pub trait TableSource {
    type Cursor: TableCursor;

    /// Fails with [`Error::SourceUnavailable`] when the table is unknown or
    /// the store cannot be opened.
    fn open(&self, table: &str) -> Result<Self::Cursor>;
}

impl<S: TableSource + ?Sized> TableSource for &S {
    type Cursor = S::Cursor;

    fn open(&self, table: &str) -> Result<Self::Cursor> {
        (**self).open(table)
    }
}

/// A lazy, forward-only, single-pass walk over the rows of one table.
pub trait TableCursor {
    fn field_count(&self) -> usize;

    fn field_name(&self, index: usize) -> Option<&str>;

    /// Move to the next row. Returns false once the rows are exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Value of column `index` in the current row.
    fn value(&self, index: usize) -> Result<RawValue>;

    /// Restrict subsequent rows with a provider expression.
    fn set_pushdown_filter(&mut self, expression: &str) -> Result<()> {
        Err(Error::UnsupportedFilter(format!(
            "provider does not filter rows: {expression}"
        )))
    }

    fn close(&mut self) -> Result<()>;

    fn field_names(&self) -> Vec<String> {
        (0..self.field_count())
            .filter_map(|index| self.field_name(index).map(str::to_string))
            .collect()
    }
}

/// Owns an open cursor and closes it on every exit path.
///
/// [`CursorGuard::close`] closes explicitly and reports close errors. If the
/// guard is dropped instead (early return, `?`, panic) the cursor is closed
/// in `drop` and a failure is only logged.
pub struct CursorGuard<C: TableCursor> {
    cursor: C,
    closed: bool,
}

impl<C: TableCursor> CursorGuard<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            closed: false,
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.cursor.close()
    }
}

impl<C: TableCursor> Deref for CursorGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.cursor
    }
}

impl<C: TableCursor> DerefMut for CursorGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.cursor
    }
}

impl<C: TableCursor> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.cursor.close() {
                warn!("failed to close table cursor: {e}");
            }
        }
    }
}

/// Parse a pushdown expression against a cursor's columns. Every clause must
/// name a known column. Whether a clause compares dates comes from its
/// literal, never from how the column is stored.
pub(crate) fn provider_filters(expression: &str, columns: &[String]) -> Result<Vec<Filter>> {
    let parsed =
        Expression::parse(expression).map_err(|e| Error::UnsupportedFilter(e.to_string()))?;
    if let Some(unknown) = parsed
        .clauses()
        .iter()
        .find(|clause| !columns.iter().any(|c| *c == clause.field))
    {
        return Err(Error::UnsupportedFilter(format!(
            "unknown field {} in {expression}",
            unknown.field
        )));
    }
    Ok(parsed.to_filters())
}
