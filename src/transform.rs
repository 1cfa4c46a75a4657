//! The transformation engine.
//!
//! Each operation is a [`TransformStep`]: a named, pure function from a [`Table`] to a
//! new [`Table`] plus a set of [`Metrics`]. Steps never modify their input. A
//! [`DataTransformer`] runs steps and appends one [`TransformLogEntry`] per successful
//! step to the log it owns; a failing step leaves the log untouched.
//!
//! ```
//! use salesetl::table::{Table, Value};
//! use salesetl::transform::DataTransformer;
//!
//! let table = Table::infer(
//!     &["revenue", "cost"],
//!     vec![
//!         vec![Value::number(1000.0), Value::number(600.0)],
//!         vec![Value::number(1000.0), Value::number(600.0)],
//!         vec![Value::Null, Value::number(400.0)],
//!     ],
//! )?;
//!
//! let mut transformer = DataTransformer::new();
//! let cleaned = transformer.clean_data(&table);
//! let enriched = transformer.add_calculated_fields(&cleaned)?;
//!
//! assert_eq!(enriched.row_count(), 1);
//! assert!(enriched.has_column("profit_margin"));
//! assert_eq!(transformer.get_summary().total_transformations, 2);
//! # Ok::<(), salesetl::error::EtlError>(())
//! ```
//!
//! # Steps
//!
//! | Step | Name in the log |
//! |------|-----------------|
//! | [`CleanData`] | `clean_data` |
//! | [`NormalizeDates`] | `normalize_dates` |
//! | [`AddCalculatedFields`] | `add_calculated_fields` |
//! | [`FilterData`] | `filter_data` |
//! | [`AggregateData`] | `aggregate_data` |
//! | [`CalculateStatistics`] | `calculate_statistics` |
//! | [`AddMetadata`] | `add_metadata` |
//! | [`EstimateProfitMargin`] | `estimate_profit_margin` |

pub mod aggregate;
pub mod calculated;
pub mod clean;
pub mod condition;
pub mod dates;
pub mod enrich;
pub mod filter;
pub mod log;

pub use aggregate::{AggOp, AggregateData};
pub use calculated::AddCalculatedFields;
pub use clean::CleanData;
pub use condition::Condition;
pub use dates::NormalizeDates;
pub use enrich::{AddMetadata, CalculateStatistics, EstimateProfitMargin};
pub use filter::FilterData;
pub use log::{Metrics, TransformLog, TransformLogEntry, TransformSummary};

use crate::error::Result;
use crate::table::{Table, Value};

/// Output of one step: the new table and what happened.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub table: Table,
    pub metrics: Metrics,
}

impl StepOutput {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            metrics: Metrics::new(),
        }
    }

    /// Add a metric, keeping insertion order.
    #[must_use]
    pub fn metric(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metrics.insert(key.to_owned(), value.into());
        self
    }
}

/// A named, deterministic table transformation.
pub trait TransformStep {
    /// Name recorded in the transformation log
    fn name(&self) -> &'static str;

    /// Produce a new table from `table`, leaving the input untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the step cannot be applied to this table; no partial
    /// result is produced.
    fn apply(&self, table: &Table) -> Result<StepOutput>;

    /// Human-readable summary of what this step does
    fn description(&self) -> String;
}

/// Runs steps for a single pipeline run and owns that run's log.
#[derive(Debug, Default)]
pub struct DataTransformer {
    log: TransformLog,
}

impl DataTransformer {
    pub fn new() -> Self {
        tracing::debug!("DataTransformer initialized");
        Self {
            log: TransformLog::new(),
        }
    }

    /// Apply any step and log it.
    ///
    /// # Errors
    ///
    /// Propagates the step's error; nothing is logged in that case.
    pub fn apply(&mut self, step: &dyn TransformStep, table: &Table) -> Result<Table> {
        tracing::debug!("Applying {}: {}", step.name(), step.description());
        let output = step.apply(table).inspect_err(|e| {
            tracing::error!("Step {} failed: {e}", step.name());
        })?;
        Ok(self.record(step.name(), output))
    }

    fn record(&mut self, name: &str, output: StepOutput) -> Table {
        tracing::info!(
            "{name}: {} rows x {} columns, {}",
            output.table.row_count(),
            output.table.column_count(),
            serde_json::Value::Object(output.metrics.clone())
        );
        self.log.record(name, output.metrics);
        output.table
    }

    /// Drop duplicate rows and rows with a null `revenue` (when that column exists).
    /// Never fails.
    pub fn clean_data(&mut self, table: &Table) -> Table {
        let step = CleanData::new();
        let output = step.execute(table);
        self.record(step.name(), output)
    }

    /// Like [`DataTransformer::clean_data`] with explicit critical columns.
    pub fn clean_data_with(&mut self, table: &Table, critical_columns: &[&str]) -> Table {
        let step = CleanData::with_critical_columns(critical_columns);
        let output = step.execute(table);
        self.record(step.name(), output)
    }

    /// Coerce the named columns to dates; unparsable cells become null.
    ///
    /// # Errors
    ///
    /// Does not fail for absent columns or bad cells; errors only surface from
    /// internal table invariants.
    pub fn normalize_dates(&mut self, table: &Table, date_columns: &[&str]) -> Result<Table> {
        self.apply(&NormalizeDates::new(date_columns), table)
    }

    /// Add date parts, profit, margin and average unit price where possible.
    ///
    /// # Errors
    ///
    /// Does not fail when source columns are missing; see [`AddCalculatedFields`].
    pub fn add_calculated_fields(&mut self, table: &Table) -> Result<Table> {
        self.apply(&AddCalculatedFields::new(), table)
    }

    /// Filter rows by `(column, condition)` pairs, combined with AND in order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EtlError::InvalidCondition`] for malformed conditions.
    pub fn filter_data(&mut self, table: &Table, conditions: &[(&str, &str)]) -> Result<Table> {
        let step = FilterData::parse(conditions.iter().copied())?;
        self.apply(&step, table)
    }

    /// Group by `group_by` and aggregate.
    ///
    /// # Errors
    ///
    /// See [`AggregateData`].
    pub fn aggregate_data(
        &mut self,
        table: &Table,
        group_by: &[&str],
        aggregations: &[(&str, AggOp)],
    ) -> Result<Table> {
        let step = AggregateData::new(
            group_by.iter().map(|s| (*s).to_owned()).collect(),
            aggregations
                .iter()
                .map(|(col, op)| ((*col).to_owned(), *op))
                .collect(),
        );
        self.apply(&step, table)
    }

    /// Add `revenue_rank` and `revenue_percentage`.
    ///
    /// # Errors
    ///
    /// Does not fail when `revenue` is absent.
    pub fn calculate_statistics(&mut self, table: &Table) -> Result<Table> {
        self.apply(&CalculateStatistics::new(), table)
    }

    /// Stamp `processed_timestamp` and `processing_version` on every row.
    ///
    /// # Errors
    ///
    /// Errors only surface from internal table invariants.
    pub fn add_metadata(&mut self, table: &Table, version: &str) -> Result<Table> {
        self.apply(&AddMetadata::new(version), table)
    }

    pub fn log(&self) -> &TransformLog {
        &self.log
    }

    /// Summary of everything done so far by this transformer.
    pub fn get_summary(&self) -> TransformSummary {
        self.log.summary()
    }
}

/// Round to two decimal places, ties to even.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Numeric view of a column: one entry per row, `None` for nulls and non-numbers.
/// Absent columns give an empty vector.
pub(crate) fn number_cells(table: &Table, name: &str) -> Vec<Option<f64>> {
    table
        .column_values(name)
        .map(|values| values.map(Value::as_number).collect())
        .unwrap_or_default()
}
