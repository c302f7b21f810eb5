//! Typed attribute values and assignment coercion.
//!
//! # Responsibility
//! - Define the value shapes a record attribute can hold.
//! - Coerce assigned or stored values into the attribute's declared type.
//!
//! # Invariants
//! - Coercion is deterministic: the same input always yields the same value.
//! - A textual form of a value coerces to the same value as the typed form,
//!   so `"1999-09-09"` and `NaiveDate(1999-09-09)` compare equal after
//!   assignment to a `Date` attribute.
//! - Blank text coerces to `Null` for every non-text type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Declared storage type of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    Text,
    Integer,
    Real,
    Boolean,
    /// Calendar date without time.
    Date,
    /// Naive timestamp; RFC 3339 inputs are normalized to UTC.
    DateTime,
}

impl AttrType {
    /// Stable lowercase name used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }

    /// Coerces `value` into this type.
    ///
    /// # Errors
    /// Returns [`CoercionError`] when the input has no representation in this
    /// type (for example `"tomorrow"` for a `Date`).
    pub fn coerce(self, value: AttrValue) -> Result<AttrValue, CoercionError> {
        if value.is_null() {
            return Ok(AttrValue::Null);
        }
        if self != Self::Text && value.is_blank_text() {
            return Ok(AttrValue::Null);
        }

        let coerced = match (self, &value) {
            (Self::Text, AttrValue::Text(_)) => Some(value.clone()),
            (Self::Text, other) => Some(AttrValue::Text(other.to_string())),

            (Self::Integer, AttrValue::Integer(_)) => Some(value.clone()),
            (Self::Integer, AttrValue::Boolean(flag)) => Some(AttrValue::Integer(i64::from(*flag))),
            (Self::Integer, AttrValue::Real(real)) => whole_real_to_i64(*real).map(AttrValue::Integer),
            (Self::Integer, AttrValue::Text(text)) => {
                text.trim().parse::<i64>().ok().map(AttrValue::Integer)
            }

            (Self::Real, AttrValue::Real(real)) => finite_real(*real),
            #[allow(clippy::cast_precision_loss)]
            (Self::Real, AttrValue::Integer(int)) => Some(AttrValue::Real(*int as f64)),
            (Self::Real, AttrValue::Text(text)) => {
                text.trim().parse::<f64>().ok().and_then(finite_real)
            }

            (Self::Boolean, AttrValue::Boolean(_)) => Some(value.clone()),
            (Self::Boolean, AttrValue::Integer(0)) => Some(AttrValue::Boolean(false)),
            (Self::Boolean, AttrValue::Integer(1)) => Some(AttrValue::Boolean(true)),
            (Self::Boolean, AttrValue::Text(text)) => parse_boolean(text).map(AttrValue::Boolean),

            (Self::Date, AttrValue::Date(_)) => Some(value.clone()),
            (Self::Date, AttrValue::DateTime(at)) => Some(AttrValue::Date(at.date())),
            (Self::Date, AttrValue::Text(text)) => parse_date(text).map(AttrValue::Date),

            (Self::DateTime, AttrValue::DateTime(_)) => Some(value.clone()),
            (Self::DateTime, AttrValue::Date(date)) => {
                Some(AttrValue::DateTime(date.and_time(NaiveTime::MIN)))
            }
            (Self::DateTime, AttrValue::Text(text)) => parse_datetime(text).map(AttrValue::DateTime),

            _ => None,
        };

        coerced.ok_or(CoercionError {
            target: self,
            input: value,
        })
    }
}

impl Display for AttrType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value held by one record attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether this value is `Null` or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        self.is_null() || self.is_blank_text()
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
            Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for AttrValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for AttrValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Input value cannot be represented in the target attribute type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    pub target: AttrType,
    pub input: AttrValue,
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot coerce `{}` into {}", self.input, self.target)
    }
}

impl Error for CoercionError {}

// NaN never equals itself, and non-finite reals have no JSON form.
fn finite_real(value: f64) -> Option<AttrValue> {
    value.is_finite().then_some(AttrValue::Real(value))
}

fn whole_real_to_i64(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    #[allow(clippy::cast_precision_loss)]
    let (lower, upper) = (i64::MIN as f64, i64::MAX as f64);
    if value < lower || value >= upper {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let truncated = value as i64;
    Some(truncated)
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(trimmed).map(|at| at.date()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(at.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(at);
        }
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}
