//! Row filtering by per-column conditions.

use super::condition::Condition;
use super::{StepOutput, TransformStep};
use crate::error::Result;
use crate::table::Table;

/// Keeps rows that satisfy every condition (logical AND, in order).
///
/// Conditions on columns the table does not have are ignored, so an all-absent
/// condition list keeps every row.
#[derive(Debug, Clone)]
pub struct FilterData {
    conditions: Vec<(String, Condition)>,
}

impl FilterData {
    pub fn new(conditions: Vec<(String, Condition)>) -> Self {
        Self { conditions }
    }

    /// Parse `(column, condition)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EtlError::InvalidCondition`] for the first malformed
    /// condition.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let conditions = pairs
            .into_iter()
            .map(|(column, raw)| Ok((column.into(), Condition::parse(raw.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    /// Infallible form of [`TransformStep::apply`].
    pub fn execute(&self, table: &Table) -> StepOutput {
        let original_rows = table.row_count();

        let active: Vec<(usize, &Condition)> = self
            .conditions
            .iter()
            .filter_map(|(column, condition)| {
                let idx = table.column_index(column);
                if idx.is_none() {
                    tracing::warn!("Filter column '{column}' not found; condition ignored");
                }
                idx.map(|idx| (idx, condition))
            })
            .collect();

        let filtered = table.filtered(|row| {
            active
                .iter()
                .all(|(idx, condition)| row.get(*idx).is_some_and(|v| condition.matches(v)))
        });
        let final_rows = filtered.row_count();

        tracing::info!(
            "Filtered data: {original_rows} -> {final_rows} rows ({} conditions)",
            active.len()
        );

        // Pairs rather than a map: one column may carry several conditions.
        let applied: Vec<serde_json::Value> = self
            .conditions
            .iter()
            .map(|(column, condition)| serde_json::json!([column, condition.to_string()]))
            .collect();

        StepOutput::new(filtered)
            .metric("conditions", applied)
            .metric("original_rows", original_rows)
            .metric("final_rows", final_rows)
            .metric("rows_filtered", original_rows - final_rows)
    }
}

impl TransformStep for FilterData {
    fn name(&self) -> &'static str {
        "filter_data"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        Ok(self.execute(table))
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|(column, condition)| format!("{column} {condition}"))
            .collect();
        format!("Keep rows where {}", parts.join(" and "))
    }
}
