//! Pipeline specification validation.
//!
//! Walks a spec against the input table's columns before any step runs, tracking how
//! each step changes the column set, and reports steps that will be skipped, ignored or
//! fail. The run itself still decides: validation findings are surfaced as warnings.

use super::spec::{PipelineSpec, SPEC_VERSION, Step};

/// Validation finding with the step it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub step_index: Option<usize>,
    pub message: String,
}

impl ValidationError {
    fn new(step_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            step_index,
            message: message.into(),
        }
    }

    fn step(step_index: usize, message: impl Into<String>) -> Self {
        Self::new(Some(step_index), message)
    }

    fn schema(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(idx) = self.step_index {
            write!(f, "Step {}: {}", idx + 1, self.message)
        } else {
            write!(f, "Schema: {}", self.message)
        }
    }
}

/// Validate a pipeline spec against the columns of its input table
pub fn validate_pipeline(spec: &PipelineSpec, input_columns: &[&str]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if spec.version != SPEC_VERSION {
        errors.push(ValidationError::schema(format!(
            "Unsupported spec version '{}', expected '{SPEC_VERSION}'",
            spec.version
        )));
    }

    // Simulate step-by-step execution to track column changes
    let mut columns: Vec<String> = input_columns.iter().map(|c| (*c).to_owned()).collect();
    for (idx, step) in spec.steps.iter().enumerate() {
        validate_step(step, idx, &mut columns, &mut errors);
    }

    errors
}

fn has(columns: &[String], name: &str) -> bool {
    columns.iter().any(|c| c == name)
}

fn add_column(columns: &mut Vec<String>, name: &str) {
    if !has(columns, name) {
        columns.push(name.to_owned());
    }
}

/// Validate a single step and update column tracking
fn validate_step(
    step: &Step,
    idx: usize,
    columns: &mut Vec<String>,
    errors: &mut Vec<ValidationError>,
) {
    match step {
        Step::Clean { critical_columns } => {
            for col in critical_columns.iter().flatten() {
                if !has(columns, col) {
                    errors.push(ValidationError::step(
                        idx,
                        format!("Critical column '{col}' not found; it will be ignored"),
                    ));
                }
            }
        }

        Step::NormalizeDates { columns: date_cols } => {
            for col in date_cols {
                if !has(columns, col) {
                    errors.push(ValidationError::step(
                        idx,
                        format!("Date column '{col}' not found; it will be skipped"),
                    ));
                }
            }
        }

        Step::AddCalculatedFields { date_column } => {
            if has(columns, date_column) {
                for part in ["year", "month", "quarter", "day_of_week", "week_of_year"] {
                    add_column(columns, part);
                }
            }
            if has(columns, "revenue") && has(columns, "cost") {
                add_column(columns, "profit");
                add_column(columns, "profit_margin");
            }
            if has(columns, "revenue") && has(columns, "units_sold") {
                add_column(columns, "avg_unit_price");
            }
        }

        Step::Filter { conditions } => {
            for col in conditions.keys() {
                if !has(columns, col) {
                    errors.push(ValidationError::step(
                        idx,
                        format!("Filter column '{col}' not found; condition will be ignored"),
                    ));
                }
            }
        }

        Step::Aggregate {
            group_by,
            aggregations,
        } => {
            for col in group_by.iter().chain(aggregations.keys()) {
                if !has(columns, col) {
                    errors.push(ValidationError::step(
                        idx,
                        format!("Cannot aggregate on non-existent column '{col}'"),
                    ));
                }
            }
            *columns = group_by.iter().chain(aggregations.keys()).cloned().collect();
        }

        Step::CalculateStatistics => {
            if has(columns, "revenue") {
                add_column(columns, "revenue_rank");
                add_column(columns, "revenue_percentage");
            } else {
                errors.push(ValidationError::step(
                    idx,
                    "No 'revenue' column; statistics will be skipped",
                ));
            }
        }

        Step::AddMetadata { .. } => {
            add_column(columns, "processed_timestamp");
            add_column(columns, "processing_version");
        }

        Step::EstimateProfitMargin { revenue_column, .. } => {
            if !has(columns, revenue_column) {
                errors.push(ValidationError::step(
                    idx,
                    format!("Revenue column '{revenue_column}' not found"),
                ));
            }
            add_column(columns, "profit_margin");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tracks_added_columns() {
        let json = r#"{"version":"0.1","name":"t","steps":[
            {"op":"add_calculated_fields"},
            {"op":"filter","conditions":{"profit_margin":">10"}},
            {"op":"aggregate","group_by":["region"],"aggregations":{"profit":"sum"}},
            {"op":"filter","conditions":{"revenue":">1"}}
        ]}"#;
        let spec = PipelineSpec::from_json(json).expect("valid spec");
        let errors = validate_pipeline(&spec, &["region", "revenue", "cost"]);

        // Only the last filter refers to a column the aggregation dropped.
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].step_index, Some(3));
        assert!(errors[0].to_string().starts_with("Step 4:"));
    }

    #[test]
    fn test_validate_missing_columns() {
        let json = r#"{"version":"0.2","name":"t","steps":[
            {"op":"normalize_dates","columns":["date"]},
            {"op":"aggregate","group_by":["store"],"aggregations":{"revenue":"sum"}},
            {"op":"calculate_statistics"}
        ]}"#;
        let spec = PipelineSpec::from_json(json).expect("valid spec");
        let errors = validate_pipeline(&spec, &["revenue"]);
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();

        assert_eq!(messages.len(), 3, "{messages:?}");
        assert!(messages[0].starts_with("Schema: Unsupported spec version"));
        assert!(messages[1].contains("'date'"));
        assert!(messages[2].contains("'store'"));
    }
}
