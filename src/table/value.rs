//! Typed cell values and column kinds.

use super::dates;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Declared kind of a column. Every non-null cell in a column has this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    Text,
    Date,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell.
///
/// Numbers are always finite: [`Value::number`] maps `NaN` and infinities to
/// [`Value::Null`], which is how undefined arithmetic (division by zero) shows up.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
    /// Calendar date (midnight) or date-time, without offset.
    Date(NaiveDateTime),
}

impl Value {
    /// Build a numeric cell, normalising `-0.0` and rejecting non-finite values.
    pub fn number(n: f64) -> Self {
        if !n.is_finite() {
            Self::Null
        } else if n == 0.0 {
            Self::Number(0.0)
        } else {
            Self::Number(n)
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Kind of this cell, `None` for nulls.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Self::Null => None,
            Self::Number(_) => Some(ColumnKind::Number),
            Self::Text(_) => Some(ColumnKind::Text),
            Self::Date(_) => Some(ColumnKind::Date),
        }
    }

    /// Order two cells of the same kind. Cells of different kinds (or nulls) are
    /// incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Interpret a raw field as a cell of the given kind. Empty fields are null.
    pub(crate) fn from_raw(raw: &str, kind: ColumnKind) -> Self {
        if raw.is_empty() {
            return Self::Null;
        }
        match kind {
            ColumnKind::Number => parse_number(raw).map_or(Self::Null, Self::number),
            ColumnKind::Date => dates::parse_date(raw).map_or(Self::Null, Self::Date),
            ColumnKind::Text => Self::Text(raw.to_owned()),
        }
    }
}

/// Strict numeric parse: no surrounding whitespace, finite values only.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for Value {
    /// Renders the cell the way it is written to CSV; nulls render as an empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => f.write_str(&dates::render_date(*d)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

// Numbers are finite and zero is normalised, so bitwise equality is value equality.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Number(n) => n.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Date(d) => d.hash(state),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
