//! Group-by aggregation.

use super::{StepOutput, TransformStep, round2};
use crate::error::{EtlError, Result};
use crate::table::{Column, ColumnKind, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Aggregation applied to one column within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggOp {
    /// Sum of non-null numbers, 0 when there are none
    Sum,
    /// Mean of non-null numbers, null when there are none
    Mean,
    Min,
    Max,
    /// Number of rows in the group
    Count,
}

impl AggOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }

    fn output_kind(self, input: ColumnKind) -> ColumnKind {
        match self {
            Self::Sum | Self::Mean | Self::Count => ColumnKind::Number,
            Self::Min | Self::Max => input,
        }
    }

    fn reduce(self, cells: &[&Value]) -> Value {
        let numbers = || cells.iter().filter_map(|v| v.as_number());
        match self {
            Self::Sum => Value::number(numbers().sum()),
            Self::Mean => {
                let (total, n) = numbers().fold((0.0, 0_u32), |(t, n), x| (t + x, n + 1));
                if n == 0 {
                    Value::Null
                } else {
                    Value::number(total / f64::from(n))
                }
            }
            Self::Min => extreme(cells, Ordering::Less),
            Self::Max => extreme(cells, Ordering::Greater),
            Self::Count => Value::from(i64::try_from(cells.len()).unwrap_or(i64::MAX)),
        }
    }
}

/// Smallest (`Less`) or largest (`Greater`) non-null cell.
fn extreme(cells: &[&Value], wanted: Ordering) -> Value {
    cells
        .iter()
        .copied()
        .filter(|v| !v.is_null())
        .fold(None::<&Value>, |best, v| match best {
            Some(b) if v.compare(b) != Some(wanted) => Some(b),
            _ => Some(v),
        })
        .cloned()
        .unwrap_or_default()
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggOp {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "count" => Ok(Self::Count),
            other => Err(EtlError::Config(format!(
                "unknown aggregation '{other}' (expected sum, mean, min, max or count)"
            ))),
        }
    }
}

/// Groups rows by equality of all `group_by` values and aggregates the listed
/// columns. Null is a valid key component. Output rows appear in order of each
/// group's first occurrence; output columns are the keys followed by one column per
/// aggregation, named after its source column.
#[derive(Debug, Clone)]
pub struct AggregateData {
    group_by: Vec<String>,
    aggregations: Vec<(String, AggOp)>,
}

impl AggregateData {
    pub fn new(group_by: Vec<String>, aggregations: Vec<(String, AggOp)>) -> Self {
        Self {
            group_by,
            aggregations,
        }
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn aggregations(&self) -> &[(String, AggOp)] {
        &self.aggregations
    }

    fn output_columns(&self, table: &Table) -> Result<(Vec<usize>, Vec<usize>, Vec<Column>)> {
        if self.group_by.is_empty() {
            return Err(EtlError::EmptyGroupBy);
        }

        let mut columns = Vec::with_capacity(self.group_by.len() + self.aggregations.len());
        let mut key_idx = Vec::with_capacity(self.group_by.len());
        for name in &self.group_by {
            let idx = table.require_column(name)?;
            let kind = table.column_kind(name).unwrap_or(ColumnKind::Text);
            key_idx.push(idx);
            columns.push(Column::new(name.as_str(), kind));
        }

        let mut agg_idx = Vec::with_capacity(self.aggregations.len());
        for (name, op) in &self.aggregations {
            let idx = table.require_column(name)?;
            let kind = table.column_kind(name).unwrap_or(ColumnKind::Text);
            if matches!(op, AggOp::Sum | AggOp::Mean) && kind != ColumnKind::Number {
                return Err(EtlError::TypeMismatch(format!(
                    "cannot {op} column '{name}' of kind {kind}"
                )));
            }
            if columns.iter().any(|c| c.name == *name) {
                return Err(EtlError::Config(format!(
                    "column '{name}' appears more than once in the aggregated output"
                )));
            }
            agg_idx.push(idx);
            columns.push(Column::new(name.as_str(), op.output_kind(kind)));
        }

        Ok((key_idx, agg_idx, columns))
    }

    fn describe_aggregations(&self) -> serde_json::Map<String, serde_json::Value> {
        self.aggregations
            .iter()
            .map(|(column, op)| (column.clone(), op.as_str().into()))
            .collect()
    }
}

impl TransformStep for AggregateData {
    fn name(&self) -> &'static str {
        "aggregate_data"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        let (key_idx, agg_idx, columns) = self.output_columns(table)?;

        // Group key -> position in `groups`, which keeps first-occurrence order.
        let mut positions: HashMap<Vec<&Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<&Value>, Vec<&[Value]>)> = Vec::new();
        for row in table.rows() {
            let key: Vec<&Value> = key_idx.iter().filter_map(|&i| row.get(i)).collect();
            let pos = *positions.entry(key.clone()).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            if let Some((_, members)) = groups.get_mut(pos) {
                members.push(row.as_slice());
            }
        }

        let rows = groups
            .into_iter()
            .map(|(key, members)| {
                let mut row: Vec<Value> = key.into_iter().cloned().collect();
                for (&idx, (_, op)) in agg_idx.iter().zip(&self.aggregations) {
                    let cells: Vec<&Value> =
                        members.iter().filter_map(|m| m.get(idx)).collect();
                    row.push(op.reduce(&cells));
                }
                row
            })
            .collect();

        let aggregated = Table::from_rows(columns, rows)?;
        let original_rows = table.row_count();
        let aggregated_rows = aggregated.row_count();
        let reduction_percent = if original_rows == 0 {
            0.0
        } else {
            round2((1.0 - aggregated_rows as f64 / original_rows as f64) * 100.0)
        };

        tracing::info!(
            "Aggregated by {}: {original_rows} -> {aggregated_rows} rows",
            self.group_by.join(", ")
        );

        Ok(StepOutput::new(aggregated)
            .metric("group_by", self.group_by.clone())
            .metric("aggregations", self.describe_aggregations())
            .metric("original_rows", original_rows)
            .metric("aggregated_rows", aggregated_rows)
            .metric("reduction_percent", reduction_percent))
    }

    fn description(&self) -> String {
        let aggs: Vec<String> = self
            .aggregations
            .iter()
            .map(|(column, op)| format!("{op}({column})"))
            .collect();
        format!("Group by {} computing {}", self.group_by.join(", "), aggs.join(", "))
    }
}
