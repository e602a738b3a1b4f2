//! The right-hand side of a leaf predicate.

use crate::date::{epoch_millis, parse_date};
use crate::json_path::FilterLiteral;
use crate::operator::{Operator, Scalar, ScalarType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A typed literal compared against an applicant's answer.
///
/// Persisted as `{"type": "STRING", "value": "Seattle"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateValue {
    String(String),
    Long(i64),
    Double(f64),
    Date(NaiveDate),
    ListOfStrings(Vec<String>),
    ListOfLongs(Vec<i64>),
    PairOfLongs(i64, i64),
    PairOfDates(NaiveDate, NaiveDate),
    ServiceArea(String),
}

/// The tag of a [`PredicateValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Long,
    Double,
    Date,
    ListOfStrings,
    ListOfLongs,
    PairOfLongs,
    PairOfDates,
    ServiceArea,
}

impl PredicateValue {
    pub fn string(value: impl Into<String>) -> Self {
        PredicateValue::String(value.into())
    }

    pub fn list_of_strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PredicateValue::ListOfStrings(values.into_iter().map(Into::into).collect())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PredicateValue::String(_) => ValueType::String,
            PredicateValue::Long(_) => ValueType::Long,
            PredicateValue::Double(_) => ValueType::Double,
            PredicateValue::Date(_) => ValueType::Date,
            PredicateValue::ListOfStrings(_) => ValueType::ListOfStrings,
            PredicateValue::ListOfLongs(_) => ValueType::ListOfLongs,
            PredicateValue::PairOfLongs(..) => ValueType::PairOfLongs,
            PredicateValue::PairOfDates(..) => ValueType::PairOfDates,
            PredicateValue::ServiceArea(_) => ValueType::ServiceArea,
        }
    }

    /// The literal as it appears in a JsonPath filter. Dates become epoch milliseconds
    /// and strings lose any embedded double quotes.
    pub fn to_filter_literal(&self) -> FilterLiteral {
        match self {
            PredicateValue::String(s) => FilterLiteral::String(strip_quotes(s)),
            PredicateValue::Long(n) => FilterLiteral::Long(*n),
            PredicateValue::Double(n) => FilterLiteral::Double(*n),
            PredicateValue::Date(d) => FilterLiteral::Long(epoch_millis(*d)),
            PredicateValue::ListOfStrings(values) => FilterLiteral::List(
                values
                    .iter()
                    .map(|s| FilterLiteral::String(strip_quotes(s)))
                    .collect(),
            ),
            PredicateValue::ListOfLongs(values) => {
                FilterLiteral::List(values.iter().copied().map(FilterLiteral::Long).collect())
            }
            PredicateValue::PairOfLongs(a, b) => {
                FilterLiteral::List(vec![FilterLiteral::Long(*a), FilterLiteral::Long(*b)])
            }
            PredicateValue::PairOfDates(a, b) => FilterLiteral::List(vec![
                FilterLiteral::Long(epoch_millis(*a)),
                FilterLiteral::Long(epoch_millis(*b)),
            ]),
            PredicateValue::ServiceArea(id) => FilterLiteral::Name(id.clone()),
        }
    }

    /// Numeric elements of range values (pairs and lists of longs), in stored order.
    pub(crate) fn range_bounds(&self) -> Option<Vec<i64>> {
        match self {
            PredicateValue::PairOfLongs(a, b) => Some(vec![*a, *b]),
            PredicateValue::PairOfDates(a, b) => Some(vec![epoch_millis(*a), epoch_millis(*b)]),
            PredicateValue::ListOfLongs(values) => Some(values.clone()),
            _ => None,
        }
    }

    /// Human readable form, with currency cents shown as dollars.
    pub fn to_display_string(&self, scalar: Scalar) -> String {
        if scalar.scalar_type() == ScalarType::CurrencyCents {
            match self {
                PredicateValue::Long(cents) => return display_currency(*cents),
                PredicateValue::PairOfLongs(a, b) => {
                    return format!("{} and {}", display_currency(*a), display_currency(*b))
                }
                _ => {}
            }
        }
        match self {
            PredicateValue::PairOfLongs(a, b) => format!("{} and {}", a, b),
            PredicateValue::PairOfDates(a, b) => format!("{} and {}", a, b),
            other => other.to_string(),
        }
    }
}

fn strip_quotes(s: &str) -> String {
    s.replace('"', "")
}

fn display_currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

/// Renders a double the way it is stored: always with a fractional part.
pub(crate) fn format_double(value: f64) -> String {
    let rendered = value.to_string();
    if value.is_finite() && !rendered.contains(['.', 'e', 'E']) {
        format!("{}.0", rendered)
    } else {
        rendered
    }
}

/// Textual predicate format of the value; see the parser for the grammar.
impl fmt::Display for PredicateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str("]")
        }
        match self {
            PredicateValue::String(s) | PredicateValue::ServiceArea(s) => {
                write!(f, "\"{}\"", strip_quotes(s))
            }
            PredicateValue::Long(n) => write!(f, "{}", n),
            PredicateValue::Double(n) => f.write_str(&format_double(*n)),
            PredicateValue::Date(d) => write!(f, "{}", d),
            PredicateValue::ListOfStrings(values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|s| format!("\"{}\"", strip_quotes(s)))
                    .collect();
                list(f, &quoted)
            }
            PredicateValue::ListOfLongs(values) => list(f, values),
            PredicateValue::PairOfLongs(a, b) => list(f, &[*a, *b]),
            PredicateValue::PairOfDates(a, b) => list(f, &[*a, *b]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueParseError {
    #[error("'{value}' is not a valid {expected}")]
    Invalid { value: String, expected: &'static str },
    #[error("{operator} expects exactly two values, got {count}")]
    NotAPair { operator: Operator, count: usize },
}

fn invalid(value: &str, expected: &'static str) -> ValueParseError {
    ValueParseError::Invalid {
        value: value.to_string(),
        expected,
    }
}

fn parse_long(raw: &str) -> Result<i64, ValueParseError> {
    raw.trim().parse().map_err(|_| invalid(raw, "whole number"))
}

fn parse_number(raw: &str) -> Result<PredicateValue, ValueParseError> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(PredicateValue::Long(n));
    }
    raw.parse::<f64>()
        .map(PredicateValue::Double)
        .map_err(|_| invalid(raw, "number"))
}

fn parse_iso_date(raw: &str) -> Result<NaiveDate, ValueParseError> {
    parse_date(raw).map_err(|_| invalid(raw, "yyyy-MM-dd date"))
}

fn parse_cents(raw: &str) -> Result<i64, ValueParseError> {
    let dollars: f64 = raw
        .trim()
        .replace(',', "")
        .parse()
        .map_err(|_| invalid(raw, "dollar amount"))?;
    Ok((dollars * 100.0).round() as i64)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn pair<T: Copy>(operator: Operator, items: &[T]) -> Result<(T, T), ValueParseError> {
    match items {
        [a, b] => Ok((*a, *b)),
        _ => Err(ValueParseError::NotAPair {
            operator,
            count: items.len(),
        }),
    }
}

/// Builds a [`PredicateValue`] from raw admin form input.
///
/// Multi-option scalars (`SELECTION`, `SELECTIONS`) take their values from
/// `raw_values`; everything else parses `raw` according to the scalar's type and the
/// operator (comma separated lists for `IN`, two values for ranges).
pub fn parse_predicate_value(
    scalar: Scalar,
    operator: Operator,
    raw: &str,
    raw_values: &[String],
) -> Result<PredicateValue, ValueParseError> {
    if matches!(scalar, Scalar::Selection | Scalar::Selections) {
        return Ok(PredicateValue::ListOfStrings(raw_values.to_vec()));
    }

    match scalar.scalar_type() {
        ScalarType::CurrencyCents => match operator {
            Operator::Between => {
                let cents = split_list(raw).map(parse_cents).collect::<Result<Vec<_>, _>>()?;
                let (a, b) = pair(operator, &cents)?;
                Ok(PredicateValue::PairOfLongs(a, b))
            }
            _ => Ok(PredicateValue::Long(parse_cents(raw)?)),
        },
        ScalarType::Date => match operator {
            Operator::AgeOlderThan | Operator::AgeYoungerThan => parse_number(raw),
            Operator::AgeBetween => {
                let ages = split_list(raw).map(parse_long).collect::<Result<Vec<_>, _>>()?;
                let (a, b) = pair(operator, &ages)?;
                Ok(PredicateValue::PairOfLongs(a, b))
            }
            Operator::Between => {
                let dates = split_list(raw)
                    .map(parse_iso_date)
                    .collect::<Result<Vec<_>, _>>()?;
                let (a, b) = pair(operator, &dates)?;
                Ok(PredicateValue::PairOfDates(a, b))
            }
            _ => Ok(PredicateValue::Date(parse_iso_date(raw)?)),
        },
        ScalarType::Long | ScalarType::Double => match operator {
            Operator::In | Operator::NotIn => Ok(PredicateValue::ListOfLongs(
                split_list(raw).map(parse_long).collect::<Result<_, _>>()?,
            )),
            Operator::Between => {
                let bounds = split_list(raw).map(parse_long).collect::<Result<Vec<_>, _>>()?;
                let (a, b) = pair(operator, &bounds)?;
                Ok(PredicateValue::PairOfLongs(a, b))
            }
            _ => parse_number(raw),
        },
        ScalarType::String | ScalarType::ListOfStrings => match operator {
            Operator::AnyOf
            | Operator::In
            | Operator::NoneOf
            | Operator::NotIn
            | Operator::SubsetOf => Ok(PredicateValue::list_of_strings(split_list(raw))),
            _ => Ok(PredicateValue::string(raw)),
        },
    }
}
