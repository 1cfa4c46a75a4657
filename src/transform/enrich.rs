//! Revenue statistics, run metadata and flat-rate margin estimates.

use super::{StepOutput, TransformStep, number_cells, round2};
use crate::error::{EtlError, Result};
use crate::table::{ColumnKind, Table, Value};
use chrono::NaiveDateTime;

/// Format of the `processed_timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Version stamped by [`AddMetadata`] when none is configured.
pub const DEFAULT_PROCESSING_VERSION: &str = "v1.0";

/// Default rate for [`EstimateProfitMargin`].
pub const DEFAULT_MARGIN_RATE: f64 = 0.3;

/// Adds `revenue_rank` (dense, highest revenue = 1) and `revenue_percentage` (share of
/// total revenue). Tables without a `revenue` column pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct CalculateStatistics;

impl CalculateStatistics {
    pub fn new() -> Self {
        Self
    }
}

fn dense_rank_descending(values: &[Option<f64>]) -> Vec<Value> {
    let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();
    values
        .iter()
        .map(|v| {
            v.and_then(|x| distinct.iter().position(|d| *d == x))
                .map_or(Value::Null, |pos| Value::from(i64::try_from(pos + 1).unwrap_or(i64::MAX)))
        })
        .collect()
}

impl TransformStep for CalculateStatistics {
    fn name(&self) -> &'static str {
        "calculate_statistics"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        if !table.has_column("revenue") {
            tracing::warn!("No revenue column; statistics skipped");
            return Ok(StepOutput::new(table.clone()).metric("fields_added", Vec::<&str>::new()));
        }

        let revenue = number_cells(table, "revenue");
        let total: f64 = revenue.iter().flatten().sum();
        let percentage = revenue
            .iter()
            .map(|r| match r {
                Some(r) if total != 0.0 => Value::number(round2(r / total * 100.0)),
                _ => Value::Null,
            })
            .collect();

        let mut out = table.clone();
        out.set_column("revenue_rank", ColumnKind::Number, dense_rank_descending(&revenue))?;
        out.set_column("revenue_percentage", ColumnKind::Number, percentage)?;
        tracing::info!("Added revenue rank and share of total revenue ({total})");

        Ok(StepOutput::new(out).metric("fields_added", vec!["revenue_rank", "revenue_percentage"]))
    }

    fn description(&self) -> String {
        "Rank rows by revenue and compute each row's share of total revenue".to_owned()
    }
}

/// Stamps every row with `processed_timestamp` and `processing_version`.
#[derive(Debug, Clone)]
pub struct AddMetadata {
    version: String,
    timestamp: Option<NaiveDateTime>,
}

impl Default for AddMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSING_VERSION)
    }
}

impl AddMetadata {
    /// Stamp with `version` and the local time at which the step runs.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            timestamp: None,
        }
    }

    /// Use a fixed timestamp instead of the current local time.
    #[must_use]
    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl TransformStep for AddMetadata {
    fn name(&self) -> &'static str {
        "add_metadata"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        let stamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Local::now().naive_local())
            .format(TIMESTAMP_FORMAT)
            .to_string();
        let rows = table.row_count();

        let mut out = table.clone();
        out.set_column(
            "processed_timestamp",
            ColumnKind::Text,
            vec![Value::text(stamp.as_str()); rows],
        )?;
        out.set_column(
            "processing_version",
            ColumnKind::Text,
            vec![Value::text(self.version.as_str()); rows],
        )?;
        tracing::info!("Added metadata columns (version {}, {stamp})", self.version);

        Ok(StepOutput::new(out)
            .metric("fields_added", vec!["processed_timestamp", "processing_version"])
            .metric("processing_version", self.version.as_str()))
    }

    fn description(&self) -> String {
        format!("Stamp processing time and version {}", self.version)
    }
}

/// Replaces `profit_margin` with a flat-rate estimate: `round(revenue * rate, 2)`.
#[derive(Debug, Clone)]
pub struct EstimateProfitMargin {
    revenue_column: String,
    margin_rate: f64,
}

impl Default for EstimateProfitMargin {
    fn default() -> Self {
        Self::new("revenue", DEFAULT_MARGIN_RATE)
    }
}

impl EstimateProfitMargin {
    pub fn new(revenue_column: impl Into<String>, margin_rate: f64) -> Self {
        Self {
            revenue_column: revenue_column.into(),
            margin_rate,
        }
    }
}

impl TransformStep for EstimateProfitMargin {
    fn name(&self) -> &'static str {
        "estimate_profit_margin"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        table.require_column(&self.revenue_column)?;
        if !self.margin_rate.is_finite() {
            return Err(EtlError::Config(format!(
                "margin rate must be a finite number, got {}",
                self.margin_rate
            )));
        }

        let margins = number_cells(table, &self.revenue_column)
            .into_iter()
            .map(|r| r.map_or(Value::Null, |r| Value::number(round2(r * self.margin_rate))))
            .collect();
        let mut out = table.clone();
        out.set_column("profit_margin", ColumnKind::Number, margins)?;
        tracing::info!(
            "Estimated profit_margin from '{}' at rate {}",
            self.revenue_column,
            self.margin_rate
        );

        Ok(StepOutput::new(out)
            .metric("revenue_column", self.revenue_column.as_str())
            .metric("margin_rate", self.margin_rate)
            .metric("fields_added", vec!["profit_margin"]))
    }

    fn description(&self) -> String {
        format!(
            "Estimate profit_margin as {} x {}",
            self.revenue_column, self.margin_rate
        )
    }
}
