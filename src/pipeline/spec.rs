//! Pipeline specification data structures.
//!
//! A pipeline spec is a small JSON document naming the ordered transformation steps of
//! a run:
//!
//! ```json
//! {
//!   "version": "0.1",
//!   "name": "Monthly sales",
//!   "steps": [
//!     { "op": "clean" },
//!     { "op": "normalize_dates", "columns": ["date"] },
//!     { "op": "add_calculated_fields" },
//!     { "op": "filter", "conditions": { "revenue": ">900", "region": "==North" } },
//!     { "op": "aggregate", "group_by": ["category"], "aggregations": { "revenue": "sum" } }
//!   ]
//! }
//! ```
//!
//! Filter conditions and aggregation specs are JSON objects whose key order is kept.

use crate::config::EtlConfig;
use crate::error::{EtlError, Result, ResultExt as _};
use crate::transform::enrich::{DEFAULT_MARGIN_RATE, DEFAULT_PROCESSING_VERSION};
use crate::transform::{
    AddCalculatedFields, AddMetadata, AggOp, AggregateData, CalculateStatistics, CleanData,
    EstimateProfitMargin, FilterData, NormalizeDates, TransformStep,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current pipeline spec version
pub const SPEC_VERSION: &str = "0.1";

/// Ordered key/value pairs of a JSON object, e.g. `{"revenue": ">900"}`.
pub type OrderedMap = serde_json::Map<String, serde_json::Value>;

/// Root pipeline specification structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Specification version for future migrations
    pub version: String,

    /// Human-readable pipeline name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered sequence of transformation steps
    pub steps: Vec<Step>,
}

impl PipelineSpec {
    /// Create an empty pipeline spec
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SPEC_VERSION.to_owned(),
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// The standard sales pipeline: clean, normalise dates, derive fields, optionally
    /// rank revenue, then stamp metadata.
    pub fn standard(config: &EtlConfig, add_stats: bool) -> Self {
        let mut spec = Self::new("standard");
        spec.description = Some("Clean, enrich and stamp a sales table".to_owned());
        spec.steps.push(Step::Clean {
            critical_columns: config.critical_columns.clone(),
        });
        if !config.date_columns.is_empty() {
            spec.steps.push(Step::NormalizeDates {
                columns: config.date_columns.clone(),
            });
        }
        spec.steps.push(Step::AddCalculatedFields {
            date_column: default_date_column(),
        });
        if add_stats {
            spec.steps.push(Step::CalculateStatistics);
        }
        spec.steps.push(Step::AddMetadata {
            version: config.processing_version.clone(),
        });
        spec
    }

    /// Load a pipeline spec from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a config error if it is not
    /// a valid spec.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline spec {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse a pipeline spec from JSON string
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Config`] for malformed JSON or unknown step ops.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline spec JSON")
    }

    /// Save pipeline spec to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write pipeline spec file")
    }

    /// Serialize pipeline spec to JSON string
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline spec")
    }

    /// Turn every step into a runnable [`TransformStep`], in order.
    ///
    /// # Errors
    ///
    /// Returns the first step's error, prefixed with its position, so a bad condition
    /// or aggregation is reported before any data is read.
    pub fn build(&self) -> Result<Vec<Box<dyn TransformStep>>> {
        if self.version != SPEC_VERSION {
            return Err(EtlError::Config(format!(
                "unsupported spec version '{}', expected '{SPEC_VERSION}'",
                self.version
            )));
        }
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, step)| step.build().with_context(|| format!("Step {}", idx + 1)))
            .collect()
    }
}

/// Transformation step (tagged enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Drop duplicate rows and rows missing a critical value
    Clean {
        /// Defaults to `revenue` when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        critical_columns: Option<Vec<String>>,
    },

    /// Coerce columns to dates
    NormalizeDates { columns: Vec<String> },

    /// Derive date parts, profit, margin and unit price
    AddCalculatedFields {
        #[serde(default = "default_date_column")]
        date_column: String,
    },

    /// Keep rows matching every condition, e.g. `{"revenue": ">900"}`
    Filter { conditions: OrderedMap },

    /// Group and aggregate, e.g. `{"revenue": "sum", "units_sold": "mean"}`
    Aggregate {
        group_by: Vec<String>,
        aggregations: OrderedMap,
    },

    /// Revenue rank and share of total
    CalculateStatistics,

    /// Stamp processing time and version
    AddMetadata {
        #[serde(default = "default_processing_version")]
        version: String,
    },

    /// Flat-rate `profit_margin` estimate from revenue
    EstimateProfitMargin {
        #[serde(default = "default_revenue_column")]
        revenue_column: String,
        #[serde(default = "default_margin_rate")]
        margin_rate: f64,
    },
}

impl Step {
    /// Build the runnable step.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidCondition`] for a bad filter condition,
    /// [`EtlError::EmptyGroupBy`] for an aggregation without keys, or
    /// [`EtlError::Config`] for values of the wrong JSON type.
    pub fn build(&self) -> Result<Box<dyn TransformStep>> {
        let step: Box<dyn TransformStep> = match self {
            Self::Clean { critical_columns } => match critical_columns {
                Some(columns) => {
                    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                    Box::new(CleanData::with_critical_columns(&columns))
                }
                None => Box::new(CleanData::new()),
            },
            Self::NormalizeDates { columns } => {
                Box::new(NormalizeDates::from_names(columns.clone()))
            }
            Self::AddCalculatedFields { date_column } => {
                Box::new(AddCalculatedFields::new().with_date_column(date_column.as_str()))
            }
            Self::Filter { conditions } => {
                let pairs = conditions
                    .iter()
                    .map(|(column, raw)| Ok((column.as_str(), string_value(column, raw)?)))
                    .collect::<Result<Vec<_>>>()?;
                Box::new(FilterData::parse(pairs)?)
            }
            Self::Aggregate {
                group_by,
                aggregations,
            } => {
                if group_by.is_empty() {
                    return Err(EtlError::EmptyGroupBy);
                }
                let aggregations = aggregations
                    .iter()
                    .map(|(column, op)| {
                        let op: AggOp = string_value(column, op)?.parse()?;
                        Ok((column.clone(), op))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Box::new(AggregateData::new(group_by.clone(), aggregations))
            }
            Self::CalculateStatistics => Box::new(CalculateStatistics::new()),
            Self::AddMetadata { version } => Box::new(AddMetadata::new(version.as_str())),
            Self::EstimateProfitMargin {
                revenue_column,
                margin_rate,
            } => Box::new(EstimateProfitMargin::new(revenue_column.as_str(), *margin_rate)),
        };
        Ok(step)
    }

    /// The `op` tag of this step.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Clean { .. } => "clean",
            Self::NormalizeDates { .. } => "normalize_dates",
            Self::AddCalculatedFields { .. } => "add_calculated_fields",
            Self::Filter { .. } => "filter",
            Self::Aggregate { .. } => "aggregate",
            Self::CalculateStatistics => "calculate_statistics",
            Self::AddMetadata { .. } => "add_metadata",
            Self::EstimateProfitMargin { .. } => "estimate_profit_margin",
        }
    }
}

fn string_value<'a>(key: &str, value: &'a serde_json::Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        EtlError::Config(format!("value for '{key}' must be a string, got {value}"))
    })
}

// Default value functions
fn default_date_column() -> String {
    "date".to_owned()
}

fn default_processing_version() -> String {
    DEFAULT_PROCESSING_VERSION.to_owned()
}

fn default_revenue_column() -> String {
    "revenue".to_owned()
}

fn default_margin_rate() -> f64 {
    DEFAULT_MARGIN_RATE
}
