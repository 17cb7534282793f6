use dbf_filter::{format_date, format_datetime, Record, Value};

use crate::error::{Error, Result};
use crate::source::{RawValue, TableCursor};

/// Strip trailing whitespace. DBF character columns are right-padded with
/// blanks; leading blanks are data and stay.
pub fn trim_text(text: &str) -> &str {
    text.trim_end()
}

/// Convert a provider value into its canonical form. Numbers pass through
/// untouched; only text is trimmed.
pub fn normalize(raw: RawValue) -> Result<Value> {
    Ok(match raw {
        RawValue::Null => Value::Null,
        RawValue::Text(text) => Value::Text(trim_owned(text)),
        RawValue::Integer(i) => Value::Integer(i),
        RawValue::Decimal(d) => Value::from(d),
        RawValue::Logical(b) => Value::Boolean(b),
        RawValue::Date(date) => Value::Date(format_date(date)),
        RawValue::DateTime(datetime) => Value::Date(format_datetime(datetime)),
        RawValue::Object(object) => Value::Text(trim_owned(object.as_text()?)),
    })
}

fn trim_owned(mut text: String) -> String {
    let len = trim_text(&text).len();
    text.truncate(len);
    text
}

/// Read every column of the cursor's current row into a record. A column
/// that fails to read or convert becomes `Null` with an entry in
/// [`Record::errors`]; the rest of the row is still read.
pub fn normalize_row<C: TableCursor + ?Sized>(cursor: &C, columns: &[String]) -> Record {
    let mut record = Record::with_capacity(columns.len());
    for (index, name) in columns.iter().enumerate() {
        match cursor.value(index).and_then(normalize) {
            Ok(value) => record.insert(name.as_str(), value),
            Err(Error::ValueConversion { message, .. }) => {
                record.insert_error(name.as_str(), message)
            }
            Err(e) => record.insert_error(name.as_str(), e.to_string()),
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    use crate::source::AsText;

    #[derive(Debug)]
    struct Money(&'static str);

    impl AsText for Money {
        fn as_text(&self) -> Result<String> {
            Ok(format!("{}   ", self.0))
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl AsText for Broken {
        fn as_text(&self) -> Result<String> {
            Err(Error::ValueConversion {
                field: "BLOB".to_string(),
                message: "unreadable".to_string(),
            })
        }
    }

    #[test]
    fn text_loses_trailing_whitespace_only() {
        assert_eq!(
            normalize(RawValue::Text("  ABC  ".to_string())).unwrap(),
            Value::from("  ABC")
        );
        assert_eq!(
            normalize(RawValue::Text("\t\n ".to_string())).unwrap(),
            Value::from("")
        );
    }

    #[test]
    fn numbers_are_untouched() {
        assert_eq!(normalize(RawValue::Decimal(42.5)).unwrap(), Value::from(42.5));
        assert_eq!(normalize(RawValue::Integer(-7)).unwrap(), Value::Integer(-7));
    }

    #[test]
    fn dates_use_the_external_format() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 4).unwrap();
        assert_eq!(
            normalize(RawValue::Date(date)).unwrap(),
            Value::Date("04/05/2025".to_string())
        );
        let datetime = date.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(
            normalize(RawValue::DateTime(datetime)).unwrap(),
            Value::Date("04/05/2025 08:30:00".to_string())
        );
    }

    #[test]
    fn objects_convert_through_their_text() {
        assert_eq!(
            normalize(RawValue::Object(Arc::new(Money("12.30 EUR")))).unwrap(),
            Value::from("12.30 EUR")
        );
        assert!(normalize(RawValue::Object(Arc::new(Broken))).is_err());
    }

    #[test]
    fn null_and_logical() {
        assert_eq!(normalize(RawValue::Null).unwrap(), Value::Null);
        assert_eq!(normalize(RawValue::Logical(true)).unwrap(), Value::Boolean(true));
    }
}
