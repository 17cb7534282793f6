use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dbf_filter::{matches, Filter};

use super::{provider_filters, RawValue, TableCursor, TableSource};
use crate::error::{Error, Result};
use crate::normalize::normalize_row;

/// Column names plus rows of raw values.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl MemoryTable {
    pub fn new<I, N>(columns: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Its length must match the column count.
    pub fn push_row(&mut self, row: Vec<RawValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::MalformedRow {
                line: self.rows.len() + 1,
                message: format!(
                    "expected {} values, got {}",
                    self.columns.len(),
                    row.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder form of [`Self::push_row`]; short rows are padded with nulls
    /// and long rows truncated.
    pub fn row(mut self, mut row: Vec<RawValue>) -> Self {
        row.resize(self.columns.len(), RawValue::Null);
        self.rows.push(row);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Tables held in memory. Table names are matched case-insensitively.
///
/// Counts opened and closed cursors, and can be told to reject pushdown
/// expressions or to fail reading given columns.
#[derive(Debug, Default)]
pub struct MemoryTableSource {
    tables: HashMap<String, Arc<MemoryTable>>,
    reject_pushdown: bool,
    failing_fields: HashSet<String>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.insert_table(name, table);
        self
    }

    pub fn insert_table(&mut self, name: &str, table: MemoryTable) {
        self.tables
            .insert(name.to_ascii_uppercase(), Arc::new(table));
    }

    /// Make every cursor refuse pushdown expressions.
    pub fn reject_pushdown(mut self) -> Self {
        self.reject_pushdown = true;
        self
    }

    /// Make reading `field` fail on every row.
    pub fn fail_field(mut self, field: impl Into<String>) -> Self {
        self.failing_fields.insert(field.into());
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cursors opened but not yet closed.
    pub fn open_cursors(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

impl TableSource for MemoryTableSource {
    type Cursor = MemoryCursor;

    fn open(&self, table: &str) -> Result<MemoryCursor> {
        let data = self
            .tables
            .get(&table.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| Error::SourceUnavailable(format!("table {table} not found")))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        let failing = data
            .columns
            .iter()
            .map(|column| self.failing_fields.contains(column))
            .collect();
        Ok(MemoryCursor {
            data,
            position: None,
            filters: Vec::new(),
            accepts_pushdown: !self.reject_pushdown,
            failing,
            closes: self.closed.clone(),
            is_closed: false,
        })
    }
}

pub struct MemoryCursor {
    data: Arc<MemoryTable>,
    position: Option<usize>,
    filters: Vec<Filter>,
    accepts_pushdown: bool,
    failing: Vec<bool>,
    closes: Arc<AtomicUsize>,
    is_closed: bool,
}

impl MemoryCursor {
    fn current_matches(&self) -> Result<bool> {
        if self.filters.is_empty() {
            return Ok(true);
        }
        let record = normalize_row(self, &self.data.columns);
        Ok(matches(&record, &self.filters)?)
    }
}

impl TableCursor for MemoryCursor {
    fn field_count(&self) -> usize {
        self.data.columns.len()
    }

    fn field_name(&self, index: usize) -> Option<&str> {
        self.data.columns.get(index).map(String::as_str)
    }

    fn advance(&mut self) -> Result<bool> {
        if self.is_closed {
            return Err(Error::SourceUnavailable("cursor is closed".to_string()));
        }
        loop {
            let next = self.position.map_or(0, |p| p + 1);
            self.position = Some(next);
            if next >= self.data.rows.len() {
                return Ok(false);
            }
            if self.current_matches()? {
                return Ok(true);
            }
        }
    }

    fn value(&self, index: usize) -> Result<RawValue> {
        let field = self.field_name(index).unwrap_or_default().to_string();
        if self.failing.get(index).copied().unwrap_or(false) {
            return Err(Error::ValueConversion {
                field,
                message: "provider failed to read value".to_string(),
            });
        }
        self.position
            .and_then(|p| self.data.rows.get(p))
            .and_then(|row| row.get(index))
            .cloned()
            .ok_or_else(|| Error::ValueConversion {
                field,
                message: "no current row".to_string(),
            })
    }

    fn set_pushdown_filter(&mut self, expression: &str) -> Result<()> {
        if !self.accepts_pushdown {
            return Err(Error::UnsupportedFilter(expression.to_string()));
        }
        self.filters = provider_filters(expression, &self.data.columns)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.is_closed {
            self.is_closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
