use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::date::value_as_date;
use crate::error::{Error, Result};
use crate::value::Value;

/// Comparison operators for filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }

    /// Whether `lhs <op> rhs` holds given `lhs.cmp(rhs)`.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" | "==" => Ok(Operator::Eq),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            other => Err(Error::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a filter checks against the field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare { operator: Operator, value: Value },
    /// Inclusive on both bounds.
    Range { from: Value, to: Value },
}

/// A single predicate on one field. A list of filters is AND-combined.
///
/// Deserializes from the JSON shape used on the command line:
///
/// ```json
/// {"field": "F_EMISION", "operator": "range",
///  "from_value": "01/05/2025", "to_value": "31/05/2025", "is_date": true}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "FilterSpec")]
pub struct Filter {
    pub field: String,
    pub condition: Condition,
    /// Compare both sides as `dd/mm/yyyy` dates instead of raw values.
    pub is_date: bool,
}

impl Filter {
    pub fn compare(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Compare {
                operator,
                value: value.into(),
            },
            is_date: false,
        }
    }

    pub fn range(field: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Range {
                from: from.into(),
                to: to.into(),
            },
            is_date: false,
        }
    }

    /// Mark the filter as a date comparison.
    pub fn dated(mut self) -> Self {
        self.is_date = true;
        self
    }

    /// Operator name as written in the JSON form (`range` for ranges).
    pub fn operator_name(&self) -> &'static str {
        match &self.condition {
            Condition::Compare { operator, .. } => operator.as_str(),
            Condition::Range { .. } => "range",
        }
    }

    pub fn literals(&self) -> Vec<&Value> {
        match &self.condition {
            Condition::Compare { value, .. } => vec![value],
            Condition::Range { from, to } => vec![from, to],
        }
    }

    /// Check the filter's own literals. Date filters need every literal to
    /// parse as a date; this surfaces caller mistakes before any row is read.
    pub fn validate(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(Error::InvalidFilter("field name is empty".to_string()));
        }
        for literal in self.literals() {
            if literal.is_null() {
                return Err(Error::InvalidFilter(format!(
                    "filter on {} has a null value",
                    self.field
                )));
            }
            if self.is_date {
                value_as_date(literal)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_date { " (date)" } else { "" };
        match &self.condition {
            Condition::Compare { operator, value } => {
                write!(f, "{} {} {}{}", self.field, operator, value, kind)
            }
            Condition::Range { from, to } => {
                write!(f, "{} in [{}, {}]{}", self.field, from, to, kind)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FilterSpec {
    field: String,
    operator: String,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    from_value: Option<Value>,
    #[serde(default)]
    to_value: Option<Value>,
    #[serde(default)]
    is_date: bool,
}

impl TryFrom<FilterSpec> for Filter {
    type Error = Error;

    fn try_from(spec: FilterSpec) -> Result<Self> {
        let condition = if spec.operator.trim().eq_ignore_ascii_case("range") {
            match (spec.from_value, spec.to_value) {
                (Some(from), Some(to)) => Condition::Range { from, to },
                _ => {
                    return Err(Error::InvalidFilter(format!(
                        "range filter on {} needs from_value and to_value",
                        spec.field
                    )))
                }
            }
        } else {
            let operator = spec.operator.parse::<Operator>()?;
            let value = spec.value.ok_or_else(|| {
                Error::InvalidFilter(format!(
                    "{} filter on {} needs a value",
                    operator, spec.field
                ))
            })?;
            Condition::Compare { operator, value }
        };
        Ok(Filter {
            field: spec.field,
            condition,
            is_date: spec.is_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operators_parse_from_symbols() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Ge);
        assert_eq!(" <= ".parse::<Operator>().unwrap(), Operator::Le);
        assert_eq!(
            "!=".parse::<Operator>().unwrap_err(),
            Error::UnsupportedOperator("!=".to_string())
        );
    }

    #[test]
    fn operator_holds() {
        assert!(Operator::Ge.holds(Ordering::Equal));
        assert!(Operator::Ge.holds(Ordering::Greater));
        assert!(!Operator::Gt.holds(Ordering::Equal));
        assert!(Operator::Le.holds(Ordering::Less));
        assert!(!Operator::Eq.holds(Ordering::Less));
    }

    #[test]
    fn deserializes_range_filter() {
        let filter: Filter = serde_json::from_str(
            r#"{"field": "F_EMISION", "operator": "range",
                "from_value": "05/05/2025", "to_value": "06/05/2025", "is_date": true}"#,
        )
        .unwrap();
        assert_eq!(
            filter,
            Filter::range("F_EMISION", "05/05/2025", "06/05/2025").dated()
        );
    }

    #[test]
    fn deserializes_comparison_filter() {
        let filters: Vec<Filter> = serde_json::from_str(
            r#"[{"field": "TOTAL", "operator": ">=", "value": 100},
                {"field": "CODIGO", "operator": "=", "value": "A1"}]"#,
        )
        .unwrap();
        assert_eq!(
            filters,
            vec![
                Filter::compare("TOTAL", Operator::Ge, 100),
                Filter::compare("CODIGO", Operator::Eq, "A1"),
            ]
        );
    }

    #[test]
    fn rejects_incomplete_specs() {
        let missing_bound = serde_json::from_str::<Filter>(
            r#"{"field": "F", "operator": "range", "from_value": "01/01/2025"}"#,
        );
        assert!(missing_bound.is_err());
        let missing_value = serde_json::from_str::<Filter>(r#"{"field": "F", "operator": ">"}"#);
        assert!(missing_value.is_err());
        let bad_operator =
            serde_json::from_str::<Filter>(r#"{"field": "F", "operator": "like", "value": "x"}"#);
        assert!(bad_operator.is_err());
    }

    #[test]
    fn validate_checks_date_literals() {
        assert!(Filter::compare("F_EMISION", Operator::Eq, "05/05/2025")
            .dated()
            .validate()
            .is_ok());
        let err = Filter::range("F_EMISION", "05/05/2025", "2025-05-06")
            .dated()
            .validate()
            .unwrap_err();
        assert!(err.is_date_error());
        // the same literal is fine when compared as text
        assert!(Filter::compare("F_EMISION", Operator::Eq, "2025-05-06")
            .validate()
            .is_ok());
        assert!(Filter::compare("", Operator::Eq, 1).validate().is_err());
    }
}
