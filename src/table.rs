//! In-memory typed tables.
//!
//! A [`Table`] is an ordered list of named, typed columns plus row-major cells. The
//! invariants are checked at construction and kept by every mutator:
//!
//! - column names are unique and non-empty,
//! - every row has exactly one [`Value`] per column,
//! - every non-null cell matches its column's [`ColumnKind`].
//!
//! Tables come from [`csv_io::parse`] (kinds inferred per column) or from
//! [`Table::infer`] for hand-built data:
//!
//! ```
//! use salesetl::table::{ColumnKind, Table, Value};
//!
//! let table = Table::infer(
//!     &["category", "revenue"],
//!     vec![
//!         vec![Value::text("Electronics"), Value::number(1000.0)],
//!         vec![Value::text("Clothing"), Value::Null],
//!     ],
//! )?;
//!
//! assert!(table.has_column("revenue"));
//! assert_eq!(table.column_kind("revenue"), Some(ColumnKind::Number));
//! assert_eq!(table.null_count(), 1);
//! # Ok::<(), salesetl::error::EtlError>(())
//! ```

pub mod csv_io;
pub mod dates;
pub mod value;

pub use value::{ColumnKind, Value};

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column declaration: name plus kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered, typed, row-major table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns an error if a column name is empty or repeated.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        validate_names(columns.iter().map(|c| c.name.as_str()))?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a table from declared columns and rows, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns an error if names are invalid, a row has the wrong width, or a cell
    /// does not match its column kind.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Create a table, taking each column's kind from its first non-null cell.
    /// All-null columns become text.
    ///
    /// # Errors
    ///
    /// Same as [`Table::from_rows`]; mixed kinds within one column are rejected.
    pub fn infer(names: &[&str], rows: Vec<Vec<Value>>) -> Result<Self> {
        let columns = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let kind = rows
                    .iter()
                    .filter_map(|row| row.get(idx).and_then(Value::kind))
                    .next()
                    .unwrap_or(ColumnKind::Text);
                Column::new(*name, kind)
            })
            .collect();
        Self::from_rows(columns, rows)
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width or a cell kind does not fit the columns.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::TypeMismatch(format!(
                "row {} has {} values, table has {} columns",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(&row) {
            check_kind(column, value)?;
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Capability query used by steps to decide whether a branch applies.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    /// Index of a column that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::NotFound`] if the column is absent.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::missing_column(name))
    }

    /// Cell at `row` in column `name`.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of a column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(move |row| row.get(idx)))
    }

    /// Non-null numeric cells of a column.
    pub fn numbers(&self, name: &str) -> Vec<f64> {
        self.column_values(name)
            .map(|values| values.filter_map(Value::as_number).collect())
            .unwrap_or_default()
    }

    /// Total number of null cells across all columns.
    pub fn null_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|v| v.is_null())
            .count()
    }

    /// Replace the column `name` if it exists, otherwise append it.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` has the wrong length or a value does not match
    /// `kind`.
    pub fn set_column(
        &mut self,
        name: &str,
        kind: ColumnKind,
        values: Vec<Value>,
    ) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(EtlError::TypeMismatch(format!(
                "column '{name}' has {} values, table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        if name.is_empty() {
            return Err(EtlError::Other("column names must not be empty".to_owned()));
        }
        let column = Column::new(name, kind);
        for value in &values {
            check_kind(&column, value)?;
        }

        match self.column_index(name) {
            Some(idx) => {
                if let Some(slot) = self.columns.get_mut(idx) {
                    *slot = column;
                }
                for (row, value) in self.rows.iter_mut().zip(values) {
                    if let Some(cell) = row.get_mut(idx) {
                        *cell = value;
                    }
                }
            }
            None => {
                self.columns.push(column);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Rewrite every cell of a column and change its kind.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::NotFound`] for an absent column, or a type mismatch if
    /// `convert` produces a value of another kind.
    pub fn coerce_column<F>(&mut self, name: &str, kind: ColumnKind, mut convert: F) -> Result<()>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self.require_column(name)?;
        let values = self
            .rows
            .iter()
            .map(|row| row.get(idx).map_or(Value::Null, &mut convert))
            .collect();
        self.set_column(name, kind, values)
    }

    /// Keep only rows for which `keep` returns true, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// A new table with the same columns and the rows selected by `keep`.
    pub fn filtered<F>(&self, keep: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let mut out = self.clone();
        out.retain_rows(keep);
        out
    }
}

fn validate_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(EtlError::Other("column names must not be empty".to_owned()));
        }
        if !seen.insert(name) {
            return Err(EtlError::Other(format!("duplicate column name '{name}'")));
        }
    }
    Ok(())
}

fn check_kind(column: &Column, value: &Value) -> Result<()> {
    match value.kind() {
        Some(kind) if kind != column.kind => Err(EtlError::TypeMismatch(format!(
            "column '{}' holds {} values, got {kind}",
            column.name, column.kind
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::infer(
            &["product", "revenue"],
            vec![
                vec![Value::text("A"), Value::number(1000.0)],
                vec![Value::text("B"), Value::Null],
            ],
        )
        .expect("valid table")
    }

    #[test]
    fn test_infer_kinds() {
        let table = sample();
        assert_eq!(table.column_kind("product"), Some(ColumnKind::Text));
        assert_eq!(table.column_kind("revenue"), Some(ColumnKind::Number));
        assert_eq!(table.column_kind("missing"), None);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = Table::new(vec![
            Column::new("a", ColumnKind::Text),
            Column::new("a", ColumnKind::Number),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_row_width_checked() {
        let mut table = sample();
        let err = table.push_row(vec![Value::text("C")]).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatchError");
    }

    #[test]
    fn test_cell_kind_checked() {
        let mut table = sample();
        let result = table.push_row(vec![Value::number(1.0), Value::number(2.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_set_column_appends_then_replaces() {
        let mut table = sample();
        table
            .set_column(
                "units",
                ColumnKind::Number,
                vec![Value::number(10.0), Value::number(12.0)],
            )
            .expect("append");
        assert_eq!(table.column_names(), vec!["product", "revenue", "units"]);

        table
            .set_column("revenue", ColumnKind::Text, vec![Value::text("x"), Value::Null])
            .expect("replace");
        assert_eq!(table.column_names(), vec!["product", "revenue", "units"]);
        assert_eq!(table.value(0, "revenue"), Some(&Value::text("x")));
        assert_eq!(table.column_kind("revenue"), Some(ColumnKind::Text));
    }

    #[test]
    fn test_require_column() {
        let table = sample();
        assert_eq!(table.require_column("revenue").expect("present"), 1);
        assert_eq!(
            table.require_column("cost").unwrap_err().kind(),
            "NotFoundError"
        );
    }

    #[test]
    fn test_filtered_is_non_destructive() {
        let table = sample();
        let filtered = table.filtered(|row| row.iter().all(|v| !v.is_null()));
        assert_eq!(filtered.row_count(), 1);
        assert_eq!(table.row_count(), 2);
    }
}
