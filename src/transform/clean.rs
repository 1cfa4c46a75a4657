//! Duplicate and missing-value cleaning.

use super::{StepOutput, TransformStep};
use crate::error::Result;
use crate::table::{Table, Value};
use std::collections::HashSet;

/// Column whose nulls are dropped when no critical columns are given.
pub const DEFAULT_CRITICAL_COLUMN: &str = "revenue";

/// Removes exact-duplicate rows (first occurrence wins, order kept), then rows with a
/// null in any critical column.
///
/// `missing_values_handled` counts null cells across *all* columns before cleaning,
/// even though only critical columns cause rows to be dropped; it is informational.
#[derive(Debug, Clone, Default)]
pub struct CleanData {
    critical_columns: Option<Vec<String>>,
}

impl CleanData {
    /// Clean with the default critical column (`revenue`, if present).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_critical_columns(columns: &[&str]) -> Self {
        Self {
            critical_columns: Some(columns.iter().map(|c| (*c).to_owned()).collect()),
        }
    }

    fn critical_indices(&self, table: &Table) -> Vec<usize> {
        match &self.critical_columns {
            Some(columns) => columns
                .iter()
                .filter_map(|c| table.column_index(c))
                .collect(),
            None => table
                .column_index(DEFAULT_CRITICAL_COLUMN)
                .into_iter()
                .collect(),
        }
    }

    /// Infallible form of [`TransformStep::apply`].
    pub fn execute(&self, table: &Table) -> StepOutput {
        let initial_rows = table.row_count();
        let missing_values = table.null_count();
        let critical = self.critical_indices(table);

        let mut seen: HashSet<&[Value]> = HashSet::with_capacity(initial_rows);
        let mut duplicates_removed = 0_usize;
        let mut missing_critical = 0_usize;
        let keep: Vec<bool> = table
            .rows()
            .iter()
            .map(|row| {
                if !seen.insert(row.as_slice()) {
                    duplicates_removed += 1;
                    return false;
                }
                let has_null = critical
                    .iter()
                    .any(|&idx| row.get(idx).is_none_or(Value::is_null));
                if has_null {
                    missing_critical += 1;
                }
                !has_null
            })
            .collect();

        let mut flags = keep.into_iter();
        let cleaned = table.filtered(|_| flags.next().unwrap_or(false));
        let final_rows = cleaned.row_count();

        if duplicates_removed + missing_critical > 0 {
            tracing::info!(
                "Cleaned data: {duplicates_removed} duplicates removed, \
                 {missing_critical} rows missing critical values"
            );
        } else {
            tracing::info!("Data already clean");
        }

        let critical_names: Vec<&str> = critical
            .iter()
            .filter_map(|&idx| table.columns().get(idx).map(|c| c.name.as_str()))
            .collect();

        StepOutput::new(cleaned)
            .metric("initial_rows", initial_rows)
            .metric("final_rows", final_rows)
            .metric("duplicates_removed", duplicates_removed)
            .metric("missing_values_handled", missing_values)
            .metric("rows_with_missing_critical", missing_critical)
            .metric("critical_columns", critical_names)
    }
}

impl TransformStep for CleanData {
    fn name(&self) -> &'static str {
        "clean_data"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        Ok(self.execute(table))
    }

    fn description(&self) -> String {
        match &self.critical_columns {
            Some(columns) => format!(
                "Remove duplicate rows and rows missing {}",
                columns.join(", ")
            ),
            None => format!("Remove duplicate rows and rows missing {DEFAULT_CRITICAL_COLUMN}"),
        }
    }
}
