use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use dbf_filter::{matches, Filter};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::{provider_filters, AsText, RawValue, TableCursor, TableSource};
use crate::config::SourceConfig;
use crate::const_vars::{DBF_DATETIME_FORMAT, DBF_DATE_FORMAT, JSONL_EXTENSION};
use crate::error::{Error, Result};
use crate::normalize::normalize_row;

/// DBF field type letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ColumnType {
    #[default]
    #[serde(rename = "C")]
    Character,
    #[serde(rename = "N")]
    Numeric,
    #[serde(rename = "F")]
    Float,
    #[serde(rename = "I")]
    Integer,
    #[serde(rename = "L")]
    Logical,
    #[serde(rename = "D")]
    Date,
    #[serde(rename = "T")]
    DateTime,
    #[serde(rename = "M")]
    Memo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ColumnType,
}

#[derive(Debug, Deserialize)]
struct TableHeader {
    columns: Vec<ColumnDef>,
}

/// Plaintext table export: one `<TABLE>.jsonl` file per table.
///
/// The first line is a header `{"columns": [{"name": "F_EMISION", "type": "D"}, ...]}`,
/// every following line one row as a JSON array in column order. Values are
/// stored the way DBF stores them, so dates are `YYYYMMDD` strings and
/// numerics may be blank-padded text.
#[derive(Debug)]
pub struct JsonlTableSource {
    root: PathBuf,
}

impl JsonlTableSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        config.validate()?;
        let root = fs::canonicalize(&config.data_source).map_err(|e| {
            Error::SourceUnavailable(format!("{}: {e}", config.data_source.display()))
        })?;
        if !root.is_dir() {
            return Err(Error::SourceUnavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        if config.encryption_password.is_some() {
            debug!("plaintext export, encryption password is not used");
        }
        debug!(
            "opened jsonl source: {}",
            config.redacted_connection_string()
        );
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate the file for `table`, matching the file stem case-insensitively.
    pub fn table_path(&self, table: &str) -> Result<PathBuf> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::SourceUnavailable(format!(
                "invalid table name {table:?}"
            )));
        }
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_jsonl = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(JSONL_EXTENSION));
            let same_name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(table));
            if is_jsonl && same_name {
                return Ok(path);
            }
        }
        Err(Error::SourceUnavailable(format!(
            "table {table} not found in {}",
            self.root.display()
        )))
    }
}

impl TableSource for JsonlTableSource {
    type Cursor = JsonlCursor;

    fn open(&self, table: &str) -> Result<JsonlCursor> {
        let path = self.table_path(table)?;
        let file = File::open(&path)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", path.display())))?;
        let mut lines = BufReader::new(file).lines();
        let header_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| Error::SourceUnavailable(format!("{} is empty", path.display())))?;
        let header: TableHeader = serde_json::from_str(&header_line).map_err(|e| {
            Error::SourceUnavailable(format!("{}: malformed header: {e}", path.display()))
        })?;
        trace!("opened {} with {} columns", path.display(), header.columns.len());
        Ok(JsonlCursor {
            names: header.columns.iter().map(|c| c.name.clone()).collect(),
            columns: header.columns,
            lines: Some(lines),
            line: 1,
            current: Vec::new(),
            filters: Vec::new(),
        })
    }
}

pub struct JsonlCursor {
    columns: Vec<ColumnDef>,
    names: Vec<String>,
    lines: Option<Lines<BufReader<File>>>,
    line: usize,
    current: Vec<JsonValue>,
    filters: Vec<Filter>,
}

impl JsonlCursor {
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn current_matches(&self) -> Result<bool> {
        if self.filters.is_empty() {
            return Ok(true);
        }
        let record = normalize_row(self, &self.names);
        Ok(matches(&record, &self.filters)?)
    }
}

impl TableCursor for JsonlCursor {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    fn advance(&mut self) -> Result<bool> {
        loop {
            let lines = self
                .lines
                .as_mut()
                .ok_or_else(|| Error::SourceUnavailable("cursor is closed".to_string()))?;
            let Some(line) = lines.next().transpose()? else {
                self.current.clear();
                return Ok(false);
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<JsonValue> =
                serde_json::from_str(&line).map_err(|e| Error::MalformedRow {
                    line: self.line,
                    message: e.to_string(),
                })?;
            if row.len() != self.columns.len() {
                return Err(Error::MalformedRow {
                    line: self.line,
                    message: format!(
                        "expected {} values, got {}",
                        self.columns.len(),
                        row.len()
                    ),
                });
            }
            self.current = row;
            if self.current_matches()? {
                return Ok(true);
            }
        }
    }

    fn value(&self, index: usize) -> Result<RawValue> {
        let column = self.columns.get(index).ok_or_else(|| Error::ValueConversion {
            field: index.to_string(),
            message: "column index out of range".to_string(),
        })?;
        let cell = self.current.get(index).ok_or_else(|| Error::ValueConversion {
            field: column.name.clone(),
            message: "no current row".to_string(),
        })?;
        convert_cell(cell, column)
    }

    fn set_pushdown_filter(&mut self, expression: &str) -> Result<()> {
        self.filters = provider_filters(expression, &self.names)?;
        debug!("jsonl cursor filtering with {expression}");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.lines = None;
        self.current.clear();
        Ok(())
    }
}

/// Nested JSON handed out as a provider object.
#[derive(Debug)]
struct JsonText(JsonValue);

impl AsText for JsonText {
    fn as_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

fn convert_cell(cell: &JsonValue, column: &ColumnDef) -> Result<RawValue> {
    let invalid = |what: &str| Error::ValueConversion {
        field: column.name.clone(),
        message: format!("{what} is not a valid {:?} value", column.kind),
    };
    match cell {
        JsonValue::Null => return Ok(RawValue::Null),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            return Ok(RawValue::Object(Arc::new(JsonText(cell.clone()))))
        }
        _ => {}
    }
    match column.kind {
        ColumnType::Character | ColumnType::Memo => Ok(match cell {
            JsonValue::String(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(other.to_string()),
        }),
        ColumnType::Numeric | ColumnType::Float | ColumnType::Integer => match cell {
            JsonValue::Number(n) => match (n.as_i64(), column.kind) {
                (Some(i), ColumnType::Numeric | ColumnType::Integer) => Ok(RawValue::Integer(i)),
                _ => n
                    .as_f64()
                    .map(RawValue::Decimal)
                    .ok_or_else(|| invalid(&n.to_string())),
            },
            JsonValue::String(s) => parse_numeric(s, column.kind).ok_or_else(|| invalid(s)),
            other => Err(invalid(&other.to_string())),
        },
        ColumnType::Logical => match cell {
            JsonValue::Bool(b) => Ok(RawValue::Logical(*b)),
            JsonValue::String(s) => match s.trim() {
                "T" | "t" | "Y" | "y" => Ok(RawValue::Logical(true)),
                "F" | "f" | "N" | "n" => Ok(RawValue::Logical(false)),
                "" | "?" => Ok(RawValue::Null),
                _ => Err(invalid(s)),
            },
            other => Err(invalid(&other.to_string())),
        },
        ColumnType::Date => match cell {
            JsonValue::String(s) if s.trim().is_empty() => Ok(RawValue::Null),
            JsonValue::String(s) => NaiveDate::parse_from_str(s.trim(), DBF_DATE_FORMAT)
                .map(RawValue::Date)
                .map_err(|_| invalid(s)),
            other => Err(invalid(&other.to_string())),
        },
        ColumnType::DateTime => match cell {
            JsonValue::String(s) if s.trim().is_empty() => Ok(RawValue::Null),
            JsonValue::String(s) => NaiveDateTime::parse_from_str(s.trim(), DBF_DATETIME_FORMAT)
                .map(RawValue::DateTime)
                .map_err(|_| invalid(s)),
            other => Err(invalid(&other.to_string())),
        },
    }
}

/// DBF numerics are stored as right-aligned text; blank means no value.
fn parse_numeric(text: &str, kind: ColumnType) -> Option<RawValue> {
    let text = text.trim();
    if text.is_empty() {
        return Some(RawValue::Null);
    }
    if kind != ColumnType::Float {
        if let Ok(i) = text.parse::<i64>() {
            return Some(RawValue::Integer(i));
        }
    }
    text.parse::<f64>().ok().map(RawValue::Decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn column(name: &str, kind: ColumnType) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            kind,
        }
    }

    fn write_table(dir: &Path, name: &str, lines: &[&str]) {
        let mut file = File::create(dir.join(format!("{name}.jsonl"))).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[test]
    fn converts_dbf_cells() {
        let date = column("F", ColumnType::Date);
        assert!(matches!(
            convert_cell(&JsonValue::from("20250505"), &date).unwrap(),
            RawValue::Date(d) if d == NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()
        ));
        assert!(matches!(
            convert_cell(&JsonValue::from("        "), &date).unwrap(),
            RawValue::Null
        ));
        assert!(convert_cell(&JsonValue::from("05/05/2025"), &date).is_err());

        let numeric = column("N", ColumnType::Numeric);
        assert!(matches!(
            convert_cell(&JsonValue::from("   12"), &numeric).unwrap(),
            RawValue::Integer(12)
        ));
        assert!(matches!(
            convert_cell(&JsonValue::from(" 12.50"), &numeric).unwrap(),
            RawValue::Decimal(d) if d == 12.5
        ));
        assert!(convert_cell(&JsonValue::from("twelve"), &numeric).is_err());

        let float = column("F", ColumnType::Float);
        assert!(matches!(
            convert_cell(&JsonValue::from(3), &float).unwrap(),
            RawValue::Decimal(d) if d == 3.0
        ));

        let logical = column("L", ColumnType::Logical);
        assert!(matches!(
            convert_cell(&JsonValue::from("T"), &logical).unwrap(),
            RawValue::Logical(true)
        ));

        let memo = column("M", ColumnType::Memo);
        let object = convert_cell(&serde_json::json!({"a": 1}), &memo).unwrap();
        match object {
            RawValue::Object(o) => assert_eq!(o.as_text().unwrap(), r#"{"a":1}"#),
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn opens_tables_case_insensitively() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_table(
            dir.path(),
            "VENTA",
            &[
                r#"{"columns": [{"name": "F_EMISION", "type": "D"}, {"name": "CODIGO"}]}"#,
                r#"["20250504", "A   "]"#,
                "",
                r#"["20250505", "B   "]"#,
            ],
        );
        let source = JsonlTableSource::new(&SourceConfig::new(dir.path()).with_password("pw"))?;
        let mut cursor = source.open("venta")?;
        assert_eq!(cursor.field_names(), vec!["F_EMISION", "CODIGO"]);
        assert_eq!(cursor.columns()[1].kind, ColumnType::Character);
        let mut rows = 0;
        while cursor.advance()? {
            rows += 1;
        }
        assert_eq!(rows, 2);
        cursor.close()?;
        assert!(cursor.advance().is_err());
        Ok(())
    }

    #[test]
    fn rejects_bad_table_names_and_missing_tables() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let source = JsonlTableSource::new(&SourceConfig::new(dir.path()))?;
        assert!(source.open("../etc/passwd").err().unwrap().is_source_error());
        assert!(source.open("VENTA").err().unwrap().is_source_error());
        assert!(JsonlTableSource::new(&SourceConfig::new(dir.path().join("missing"))).is_err());
        Ok(())
    }

    #[test]
    fn malformed_rows_are_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_table(
            dir.path(),
            "T",
            &[r#"{"columns": [{"name": "A"}, {"name": "B"}]}"#, r#"["only one"]"#],
        );
        let source = JsonlTableSource::new(&SourceConfig::new(dir.path()))?;
        let mut cursor = source.open("T")?;
        assert!(matches!(
            cursor.advance(),
            Err(Error::MalformedRow { line: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn pushdown_uses_column_types() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_table(
            dir.path(),
            "VENTA",
            &[
                r#"{"columns": [{"name": "F_EMISION", "type": "D"}, {"name": "TOTAL", "type": "N"}]}"#,
                r#"["20250410", "10"]"#,
                r#"["20250505", "20"]"#,
                r#"["20250601", "30"]"#,
            ],
        );
        let source = JsonlTableSource::new(&SourceConfig::new(dir.path()))?;
        let mut cursor = source.open("VENTA")?;
        // chronological, although "10/04/2025" sorts after "05/05/2025" as text
        cursor.set_pushdown_filter("F_EMISION <= DATE '05/05/2025'")?;
        let mut totals = Vec::new();
        while cursor.advance()? {
            if let RawValue::Integer(total) = cursor.value(1)? {
                totals.push(total);
            }
        }
        assert_eq!(totals, vec![10, 20]);

        let mut cursor = source.open("VENTA")?;
        assert!(cursor.set_pushdown_filter("CODIGO = 'A'").is_err());
        Ok(())
    }
}
