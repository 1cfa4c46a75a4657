//! Pipeline execution engine.
//!
//! Pulls one blob from the raw store, runs the pipeline's steps over it in order and
//! writes the result to the processed store. The first failing step aborts the run;
//! the log entries of the steps that completed are returned with the failure.

use super::extract::DataExtractor;
use super::load::DataLoader;
use super::spec::PipelineSpec;
use super::validation::validate_pipeline;
use crate::config::EtlConfig;
use crate::error::EtlError;
use crate::store::BlobStore;
use crate::table::Table;
use crate::transform::{DataTransformer, TransformSummary};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Stage of a run, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Load => "load",
        })
    }
}

/// Report generated after pipeline execution
#[derive(Debug, Clone)]
pub struct RunReport {
    pub input: String,

    /// Location of the written blob
    pub output_location: String,

    /// The table that was written
    pub table: Table,

    /// Number of rows before processing
    pub rows_before: usize,

    /// Number of columns before processing
    pub columns_before: usize,

    /// Number of steps successfully applied
    pub steps_applied: usize,

    /// Validation findings for steps that were skipped or ignored
    pub warnings: Vec<String>,

    /// Per-step log of the run
    pub transformations: TransformSummary,

    /// Revenue figures, when the output has `revenue` and `profit_margin`
    pub financial: Option<FinancialSummary>,

    /// Time taken for execution
    pub duration: Duration,
}

impl RunReport {
    pub fn rows_after(&self) -> usize {
        self.table.row_count()
    }

    pub fn columns_after(&self) -> usize {
        self.table.column_count()
    }

    /// Create a summary message
    pub fn summary(&self) -> String {
        format!(
            "Pipeline completed: {} -> {}, rows {} → {}, columns {} → {}, {} steps, {:.2}s",
            self.input,
            self.output_location,
            self.rows_before,
            self.rows_after(),
            self.columns_before,
            self.columns_after(),
            self.steps_applied,
            self.duration.as_secs_f64()
        )
    }

    /// Machine-readable report, without the table itself.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "input": self.input,
            "output": self.output_location,
            "rows_before": self.rows_before,
            "rows_after": self.rows_after(),
            "columns_before": self.columns_before,
            "columns_after": self.columns_after(),
            "steps_applied": self.steps_applied,
            "warnings": self.warnings,
            "transformations": self.transformations,
            "financial": self.financial,
        })
    }
}

/// A failed run: the error, where it happened and what completed before it.
#[derive(Debug)]
pub struct RunFailure {
    pub error: EtlError,
    pub phase: RunPhase,
    pub transformations: TransformSummary,
}

impl RunFailure {
    /// Stable error kind, e.g. `NotFoundError`.
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }

    pub fn completed_steps(&self) -> Vec<&str> {
        self.transformations.step_names()
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Revenue figures of a processed table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub average_revenue: f64,
    pub max_revenue: f64,
    pub min_revenue: f64,
}

impl FinancialSummary {
    /// Figures over the non-null revenue cells, or `None` unless the table has both
    /// `revenue` and `profit_margin` and at least one revenue value.
    ///
    /// Total profit sums the `profit` column when present; otherwise it sums
    /// `profit_margin`, which then holds flat-rate amounts.
    pub fn from_table(table: &Table) -> Option<Self> {
        if !table.has_column("revenue") || !table.has_column("profit_margin") {
            return None;
        }
        let revenue = table.numbers("revenue");
        if revenue.is_empty() {
            return None;
        }

        let profit_column = if table.has_column("profit") {
            "profit"
        } else {
            "profit_margin"
        };
        let total_revenue: f64 = revenue.iter().sum();
        Some(Self {
            total_revenue,
            total_profit: table.numbers(profit_column).iter().sum(),
            average_revenue: total_revenue / revenue.len() as f64,
            max_revenue: revenue.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_revenue: revenue.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }
}

impl fmt::Display for FinancialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FINANCIAL SUMMARY:")?;
        writeln!(f, "   Total Revenue:      {}", currency(self.total_revenue))?;
        writeln!(f, "   Total Profit:       {}", currency(self.total_profit))?;
        writeln!(f, "   Average Revenue:    {}", currency(self.average_revenue))?;
        writeln!(f, "   Max Revenue:        {}", currency(self.max_revenue))?;
        write!(f, "   Min Revenue:        {}", currency(self.min_revenue))
    }
}

/// `$1,234.50` style amounts.
fn currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn failure(
    phase: RunPhase,
    transformer: &DataTransformer,
) -> impl FnOnce(EtlError) -> RunFailure + '_ {
    move |error| RunFailure {
        error,
        phase,
        transformations: transformer.get_summary(),
    }
}

/// Extract → transform → load over a pair of blob stores.
#[derive(Debug)]
pub struct EtlPipeline<R, P> {
    extractor: DataExtractor<R>,
    loader: DataLoader<P>,
    config: EtlConfig,
}

impl<R: BlobStore, P: BlobStore> EtlPipeline<R, P> {
    pub fn new(raw: R, processed: P) -> Self {
        Self::with_config(raw, processed, EtlConfig::default())
    }

    pub fn with_config(raw: R, processed: P, config: EtlConfig) -> Self {
        tracing::info!(
            "ETL pipeline ready: {} -> {}",
            raw.location(),
            processed.location()
        );
        Self {
            extractor: DataExtractor::new(raw),
            loader: DataLoader::new(processed),
            config,
        }
    }

    pub fn raw_store(&self) -> &R {
        self.extractor.store()
    }

    pub fn processed_store(&self) -> &P {
        self.loader.store()
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Names of the blobs available as input.
    ///
    /// # Errors
    ///
    /// Returns the raw store's listing error.
    pub fn list_raw_files(&self) -> crate::error::Result<Vec<String>> {
        self.extractor.list_files()
    }

    /// Run the standard pipeline (see [`PipelineSpec::standard`]). The output name
    /// defaults to `processed_<input>`.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the first error and the completed steps.
    pub fn run_pipeline(
        &mut self,
        input: &str,
        output: Option<&str>,
        add_stats: bool,
    ) -> Result<RunReport, RunFailure> {
        let spec = PipelineSpec::standard(&self.config, add_stats);
        self.run_spec(&spec, input, output)
    }

    /// Run an explicit pipeline spec.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the first error and the completed steps.
    pub fn run_spec(
        &mut self,
        spec: &PipelineSpec,
        input: &str,
        output: Option<&str>,
    ) -> Result<RunReport, RunFailure> {
        let start = Instant::now();
        let mut transformer = DataTransformer::new();
        let output = output.map_or_else(|| format!("processed_{input}"), str::to_owned);

        tracing::info!("Starting ETL pipeline '{}': {input} -> {output}", spec.name);

        let result = self.execute(spec, input, &output, &mut transformer, start);
        match &result {
            Ok(report) => {
                tracing::info!("{}", report.summary());
                if let Some(financial) = &report.financial {
                    tracing::info!("{financial}");
                }
            }
            Err(failure) => {
                tracing::error!(
                    "ETL pipeline failed during {}: {} ({})",
                    failure.phase,
                    failure.error,
                    failure.kind()
                );
            }
        }
        result
    }

    fn execute(
        &mut self,
        spec: &PipelineSpec,
        input: &str,
        output: &str,
        transformer: &mut DataTransformer,
        start: Instant,
    ) -> Result<RunReport, RunFailure> {
        // Bad conditions and aggregations are rejected before anything is read.
        let steps = spec
            .build()
            .map_err(failure(RunPhase::Transform, transformer))?;

        tracing::info!("[PHASE 1/3] EXTRACT");
        let table = self
            .extractor
            .extract_csv(input)
            .map_err(failure(RunPhase::Extract, transformer))?;
        let rows_before = table.row_count();
        let columns_before = table.column_count();
        tracing::info!("Columns: {}", table.column_names().join(", "));

        let warnings: Vec<String> = validate_pipeline(spec, &table.column_names())
            .iter()
            .map(ToString::to_string)
            .collect();
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        tracing::info!("[PHASE 2/3] TRANSFORM");
        let mut current = table;
        for step in &steps {
            current = transformer
                .apply(step.as_ref(), &current)
                .map_err(failure(RunPhase::Transform, transformer))?;
        }
        tracing::info!(
            "Final shape: {} rows x {} columns",
            current.row_count(),
            current.column_count()
        );

        tracing::info!("[PHASE 3/3] LOAD");
        let output_location = self
            .loader
            .load_csv(&current, output)
            .map_err(failure(RunPhase::Load, transformer))?;

        Ok(RunReport {
            input: input.to_owned(),
            output_location,
            financial: FinancialSummary::from_table(&current),
            table: current,
            rows_before,
            columns_before,
            steps_applied: steps.len(),
            warnings,
            transformations: transformer.get_summary(),
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    const SALES: &str = "\
date,product,category,revenue,cost,units_sold
2024-01-01,Widget,Electronics,1000,600,10
2024-01-02,Gadget,Electronics,1500,900,15
2024-01-01,Widget,Electronics,1000,600,10
2024-01-03,Shirt,Clothing,800,500,40
2024-01-04,Hat,Clothing,,400,8
";

    fn pipeline() -> EtlPipeline<MemoryBlobStore, MemoryBlobStore> {
        EtlPipeline::new(
            MemoryBlobStore::new("raw").with_blob("sales.csv", SALES),
            MemoryBlobStore::new("processed"),
        )
    }

    #[test]
    fn test_standard_run() {
        let mut pipeline = pipeline();
        let report = pipeline.run_pipeline("sales.csv", None, true).expect("run");

        assert_eq!(report.rows_before, 5);
        assert_eq!(report.rows_after(), 3);
        assert_eq!(report.output_location, "memory:processed/processed_sales.csv");
        assert!(pipeline.processed_store().exists("processed_sales.csv"));
        assert_eq!(
            report.transformations.step_names(),
            vec![
                "clean_data",
                "normalize_dates",
                "add_calculated_fields",
                "calculate_statistics",
                "add_metadata"
            ]
        );

        let financial = report.financial.expect("financial summary");
        assert!((financial.total_revenue - 3300.0).abs() < 1e-9);
        assert!((financial.total_profit - 1300.0).abs() < 1e-9);
        assert!((financial.average_revenue - 1100.0).abs() < 1e-9);
        assert!((financial.max_revenue - 1500.0).abs() < 1e-9);
        assert!((financial.min_revenue - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_input_fails_in_extract() {
        let mut pipeline = pipeline();
        let failure = pipeline.run_pipeline("nope.csv", Some("out.csv"), false).unwrap_err();
        assert_eq!(failure.kind(), "NotFoundError");
        assert_eq!(failure.phase, RunPhase::Extract);
        assert!(failure.completed_steps().is_empty());
        assert!(pipeline.processed_store().is_empty());
    }

    #[test]
    fn test_failure_keeps_completed_steps() {
        let spec = PipelineSpec::from_json(
            r#"{"version":"0.1","name":"t","steps":[
                {"op":"clean"},
                {"op":"aggregate","group_by":["store"],"aggregations":{"revenue":"sum"}}
            ]}"#,
        )
        .expect("spec");
        let mut pipeline = pipeline();
        let failure = pipeline.run_spec(&spec, "sales.csv", None).unwrap_err();
        assert_eq!(failure.kind(), "NotFoundError");
        assert_eq!(failure.phase, RunPhase::Transform);
        assert_eq!(failure.completed_steps(), vec!["clean_data"]);
        assert!(!pipeline.processed_store().exists("processed_sales.csv"));
    }

    #[test]
    fn test_currency_format() {
        assert_eq!(currency(3300.0), "$3,300.00");
        assert_eq!(currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(currency(12.5), "$12.50");
        assert_eq!(currency(-950.0), "-$950.00");
    }
}
