//! Table reader: opens a table, walks its rows once and returns the
//! normalized records that pass every filter.

use std::io::{self, Write};
use std::str::FromStr;

use dbf_filter::{matches, Filter, PushdownPolicy, Record};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::const_vars::JSON_INDENT;
use crate::error::{Error, Result};
use crate::normalize::normalize_row;
use crate::source::{CursorGuard, TableCursor, TableSource};

mod collector;

use collector::Collector;

/// Column layout of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub field_count: usize,
    pub columns: Vec<String>,
}

/// Order of the returned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadOrder {
    /// Physical row order.
    #[default]
    Forward,
    /// Last physical row first. With a limit, the last `limit` matches.
    NewestFirst,
}

impl FromStr for ReadOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(ReadOrder::Forward),
            "newest" | "newest-first" | "reverse" => Ok(ReadOrder::NewestFirst),
            other => Err(Error::InvalidConfig(format!("unknown read order {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    pub limit: Option<usize>,
    pub filters: Vec<Filter>,
    pub order: ReadOrder,
    /// Hand pushable filters to the provider.
    pub pushdown: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            limit: None,
            filters: Vec::new(),
            order: ReadOrder::default(),
            pushdown: true,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_order(mut self, order: ReadOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_pushdown(mut self, pushdown: bool) -> Self {
        self.pushdown = pushdown;
        self
    }
}

/// Reads tables from a [`TableSource`].
///
/// Every call opens its own cursor and closes it before returning, on
/// success and on error alike.
#[derive(Debug)]
pub struct TableReader<S> {
    source: S,
    pushdown: PushdownPolicy,
}

impl<S: TableSource> TableReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            pushdown: PushdownPolicy::default(),
        }
    }

    pub fn with_pushdown_policy(mut self, policy: PushdownPolicy) -> Self {
        self.pushdown = policy;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Read up to `limit` rows in physical order, unfiltered.
    pub fn read_table(&self, table: &str, limit: Option<usize>) -> Result<Vec<Record>> {
        self.read(
            table,
            &ReadOptions {
                limit,
                ..ReadOptions::default()
            },
        )
    }

    pub fn read(&self, table: &str, options: &ReadOptions) -> Result<Vec<Record>> {
        for filter in &options.filters {
            filter.validate()?;
        }
        if options.limit == Some(0) {
            debug!("limit 0 on {table}, not opening the table");
            return Ok(Vec::new());
        }

        let mut cursor = CursorGuard::new(self.source.open(table)?);
        let columns = cursor.field_names();
        debug!("reading {table}: {} columns", columns.len());

        if options.pushdown {
            self.apply_pushdown(&mut *cursor, &options.filters)?;
        }

        let mut collector = Collector::new(options.order, options.limit);
        let mut scanned = 0usize;
        while !collector.is_full() && cursor.advance()? {
            scanned += 1;
            let record = normalize_row(&*cursor, &columns);
            for error in record.errors() {
                warn!("{table} row {scanned}: {error}");
            }
            if matches(&record, &options.filters)? {
                collector.push(record);
            }
        }
        cursor.close()?;

        let records = collector.finish();
        debug!(
            "read {} of {scanned} scanned rows from {table}",
            records.len()
        );
        Ok(records)
    }

    pub fn get_table_info(&self, table: &str) -> Result<TableMetadata> {
        let cursor = CursorGuard::new(self.source.open(table)?);
        let metadata = TableMetadata {
            field_count: cursor.field_count(),
            columns: cursor.field_names(),
        };
        cursor.close()?;
        Ok(metadata)
    }

    /// [`Self::read`] rendered as a JSON array of objects.
    pub fn to_json(&self, table: &str, options: &ReadOptions, pretty: bool) -> Result<String> {
        let records = self.read(table, options)?;
        let mut out = Vec::new();
        write_json(&mut out, &records, pretty)?;
        String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }

    fn apply_pushdown<C: TableCursor>(&self, cursor: &mut C, filters: &[Filter]) -> Result<()> {
        let Some(expression) = self.pushdown.compile(filters) else {
            trace!("no pushable filters");
            return Ok(());
        };
        match cursor.set_pushdown_filter(&expression) {
            Ok(()) => {
                debug!("pushed down: {expression}");
                Ok(())
            }
            Err(Error::UnsupportedFilter(reason)) => {
                warn!("pushdown rejected, filtering in memory: {reason}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Serialize `value` as JSON, indented with four spaces when `pretty`.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        value.serialize(&mut serializer)?;
    } else {
        serde_json::to_writer(writer, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryTable, MemoryTableSource, RawValue};
    use dbf_filter::{Operator, Value};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn source() -> MemoryTableSource {
        let table = MemoryTable::new(["CODIGO", "TOTAL"])
            .row(vec![text("A  "), RawValue::Integer(1)])
            .row(vec![text("B  "), RawValue::Integer(2)])
            .row(vec![text("C  "), RawValue::Integer(3)]);
        MemoryTableSource::new().with_table("T", table)
    }

    #[test]
    fn read_order_from_str() {
        assert_eq!("newest".parse::<ReadOrder>().unwrap(), ReadOrder::NewestFirst);
        assert_eq!("Forward".parse::<ReadOrder>().unwrap(), ReadOrder::Forward);
        assert!("sideways".parse::<ReadOrder>().is_err());
    }

    #[test]
    fn reads_and_trims() {
        let reader = TableReader::new(source());
        let records = reader.read_table("T", None).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("CODIGO"), Some(&Value::from("A")));
        assert_eq!(reader.source().open_cursors(), 0);
    }

    #[test]
    fn zero_limit_does_not_open() {
        let reader = TableReader::new(source());
        assert!(reader.read_table("T", Some(0)).unwrap().is_empty());
        assert_eq!(reader.source().opened(), 0);
    }

    #[test]
    fn invalid_filter_fails_before_open() {
        let reader = TableReader::new(source());
        let options =
            ReadOptions::new().with_filter(Filter::compare("F", Operator::Eq, "xx").dated());
        assert!(reader.read("T", &options).unwrap_err().is_date_error());
        assert_eq!(reader.source().opened(), 0);
    }

    #[test]
    fn forward_limit_stops_early() {
        let reader = TableReader::new(source());
        let records = reader
            .read("T", &ReadOptions::new().with_limit(1))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("TOTAL"), Some(&Value::Integer(1)));
    }

    #[test]
    fn json_output_keeps_column_order() {
        let reader = TableReader::new(source());
        let options = ReadOptions::new()
            .with_filter(Filter::compare("TOTAL", Operator::Ge, 3));
        assert_eq!(
            reader.to_json("T", &options, false).unwrap(),
            r#"[{"CODIGO":"C","TOTAL":3}]"#
        );
        let pretty = reader.to_json("T", &options, true).unwrap();
        assert_eq!(
            pretty,
            "[\n    {\n        \"CODIGO\": \"C\",\n        \"TOTAL\": 3\n    }\n]"
        );
    }

    #[test]
    fn table_info_reads_no_rows() {
        let reader = TableReader::new(source());
        let info = reader.get_table_info("t").unwrap();
        assert_eq!(
            info,
            TableMetadata {
                field_count: 2,
                columns: vec!["CODIGO".to_string(), "TOTAL".to_string()],
            }
        );
        assert_eq!(reader.source().open_cursors(), 0);
    }
}
