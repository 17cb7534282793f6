use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::date::value_as_date;
use crate::error::{Error, Result};
use crate::filter::{Condition, Filter};
use crate::record::Record;
use crate::value::Value;

impl Filter {
    /// Evaluate the filter against one record.
    ///
    /// A field missing from the record is a non-match. For date filters a
    /// value that does not parse is an error, while a `Null` value is a
    /// non-match.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        let Some(field_value) = record.get(&self.field) else {
            return Ok(false);
        };
        if self.is_date {
            self.matches_date(field_value)
        } else {
            Ok(self.matches_value(field_value))
        }
    }

    fn matches_value(&self, field_value: &Value) -> bool {
        match &self.condition {
            Condition::Compare { operator, value } => field_value
                .compare(value)
                .is_some_and(|ordering| operator.holds(ordering)),
            Condition::Range { from, to } => {
                let above = from.compare(field_value);
                let below = field_value.compare(to);
                matches!(above, Some(Ordering::Less | Ordering::Equal))
                    && matches!(below, Some(Ordering::Less | Ordering::Equal))
            }
        }
    }

    fn matches_date(&self, field_value: &Value) -> Result<bool> {
        let Some(date) = value_as_date(field_value)? else {
            return Ok(false);
        };
        match &self.condition {
            Condition::Compare { operator, value } => {
                let rhs = literal_date(value)?;
                Ok(operator.holds(date.cmp(&rhs)))
            }
            Condition::Range { from, to } => {
                let (lower, upper) = (literal_date(from)?, literal_date(to)?);
                Ok(lower <= date && date <= upper)
            }
        }
    }
}

fn literal_date(value: &Value) -> Result<NaiveDate> {
    value_as_date(value)?
        .ok_or_else(|| Error::InvalidFilter("date filter compares against null".to_string()))
}

/// True when the record passes every filter. An empty filter list matches
/// everything.
///
/// Every filter is evaluated even after one fails, so an error from any of
/// them is returned regardless of filter order.
pub fn matches(record: &Record, filters: &[Filter]) -> Result<bool> {
    let mut all = true;
    for filter in filters {
        all &= filter.matches(record)?;
    }
    Ok(all)
}
