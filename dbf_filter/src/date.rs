use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::value::Value;

/// External date format used by filters and normalized date values.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Format for normalized timestamps; the date part comes first so
/// [`parse_date`] can read it back.
pub const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Parse a `dd/mm/yyyy` date. A trailing time component separated by
/// whitespace is ignored.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let date_part = text.split_whitespace().next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|_| Error::DateParse {
        value: text.to_string(),
        format: DATE_FORMAT,
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_datetime(datetime: NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

/// Interpret a value as a date. `Null` yields `None`; anything else must
/// parse or the call fails.
pub fn value_as_date(value: &Value) -> Result<Option<NaiveDate>> {
    match value {
        Value::Null => Ok(None),
        other => parse_date(&other.to_string()).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_day_month_year() {
        let date = parse_date("04/05/2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 4).unwrap());
    }

    #[test]
    fn ignores_trailing_time() {
        let date = parse_date("05/05/2025 0:00:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap());
    }

    #[test]
    fn rejects_other_formats() {
        let err = parse_date("2025-05-05").unwrap_err();
        assert!(err.is_date_error());
        assert!(parse_date("").is_err());
        assert!(parse_date("31/02/2025").is_err());
    }

    #[test]
    fn formatted_values_parse_back() {
        let datetime = NaiveDate::from_ymd_opt(2025, 12, 1)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        let text = format_datetime(datetime);
        assert_eq!(text, "01/12/2025 13:45:00");
        assert_eq!(parse_date(&text).unwrap(), datetime.date());
        assert_eq!(format_date(datetime.date()), "01/12/2025");
    }

    #[test]
    fn null_is_not_a_date() {
        assert_eq!(value_as_date(&Value::Null).unwrap(), None);
        assert!(value_as_date(&Value::Integer(20250505)).is_err());
    }
}
