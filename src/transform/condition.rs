//! Filter conditions.
//!
//! Conditions arrive as short strings such as `">900"` or `"==North"` and are parsed
//! once, at the boundary, into a [`Condition`]. Operators are checked in the order
//! `>`, `<`, `==`, so `">=5"` is a greater-than whose operand (`"=5"`) is not a number.

use crate::error::{EtlError, Result};
use crate::table::Value;
use std::fmt;
use std::str::FromStr;

/// A parsed comparison against a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Numeric `cell > operand`
    GreaterThan(f64),
    /// Numeric `cell < operand`
    LessThan(f64),
    /// Exact string equality against the cell's rendered text
    Equals(String),
}

impl Condition {
    /// Parse a condition string.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidCondition`] when no operator is present or when a
    /// `>`/`<` operand is not a finite number.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('>') {
            numeric_operand(raw, '>').map(Self::GreaterThan)
        } else if raw.contains('<') {
            numeric_operand(raw, '<').map(Self::LessThan)
        } else if raw.contains("==") {
            Ok(Self::Equals(raw.replace("==", "").trim().to_owned()))
        } else {
            Err(EtlError::InvalidCondition(format!(
                "'{raw}' has no recognised operator (expected >, < or ==)"
            )))
        }
    }

    /// Whether a cell satisfies this condition. Nulls never match; non-numeric
    /// cells never match a numeric comparison.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::GreaterThan(operand) => value.as_number().is_some_and(|n| n > *operand),
            Self::LessThan(operand) => value.as_number().is_some_and(|n| n < *operand),
            Self::Equals(operand) => !value.is_null() && value.to_string() == *operand,
        }
    }
}

fn numeric_operand(raw: &str, op: char) -> Result<f64> {
    let operand = raw.replace(op, "");
    let operand = operand.trim();
    operand
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            EtlError::InvalidCondition(format!(
                "'{raw}': operand '{operand}' is not a number"
            ))
        })
}

impl FromStr for Condition {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan(n) => write!(f, ">{n}"),
            Self::LessThan(n) => write!(f, "<{n}"),
            Self::Equals(s) => write!(f, "=={s}"),
        }
    }
}
