//! Best-effort date normalisation.

use super::{StepOutput, TransformStep};
use crate::error::Result;
use crate::table::dates::parse_date;
use crate::table::{ColumnKind, Table, Value};

/// Coerces each named column to dates. Cells that do not parse become null; named
/// columns that are absent are skipped.
#[derive(Debug, Clone)]
pub struct NormalizeDates {
    columns: Vec<String>,
}

impl NormalizeDates {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        }
    }

    pub fn from_names(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

fn to_date(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::Date(*d),
        Value::Text(s) => parse_date(s).map_or(Value::Null, Value::Date),
        Value::Null | Value::Number(_) => Value::Null,
    }
}

fn null_cells(table: &Table, column: &str) -> usize {
    table
        .column_values(column)
        .map_or(0, |values| values.filter(|v| v.is_null()).count())
}

impl TransformStep for NormalizeDates {
    fn name(&self) -> &'static str {
        "normalize_dates"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        let mut out = table.clone();
        let mut processed: Vec<&str> = Vec::new();
        let mut nullified = 0_usize;

        for column in &self.columns {
            if !out.has_column(column) || processed.contains(&column.as_str()) {
                continue;
            }
            let nulls_before = null_cells(&out, column);
            out.coerce_column(column, ColumnKind::Date, to_date)?;
            let nulls_after = null_cells(&out, column);
            nullified += nulls_after.saturating_sub(nulls_before);
            processed.push(column);
        }

        if processed.is_empty() {
            tracing::warn!("No date columns found among: {}", self.columns.join(", "));
        } else {
            tracing::info!("Dates normalized for columns: {}", processed.join(", "));
        }
        if nullified > 0 {
            tracing::warn!("{nullified} cells could not be read as dates and were set to null");
        }

        Ok(StepOutput::new(out)
            .metric("columns_processed", processed)
            .metric("cells_nullified", nullified))
    }

    fn description(&self) -> String {
        format!("Normalize dates in {}", self.columns.join(", "))
    }
}
