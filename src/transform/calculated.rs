//! Derived columns: date parts and unit economics.

use super::{StepOutput, TransformStep, number_cells, round2};
use crate::error::Result;
use crate::table::{ColumnKind, Table, Value};
use chrono::{Datelike as _, NaiveDateTime};

/// Adds whichever derived fields the table's columns allow:
///
/// - `year`, `month`, `quarter`, `day_of_week` (0 = Monday), `week_of_year` (ISO)
///   when the date column holds dates,
/// - `profit` and `profit_margin` when `revenue` and `cost` exist,
/// - `avg_unit_price` when `revenue` and `units_sold` exist.
///
/// Division by zero gives null for that row.
#[derive(Debug, Clone)]
pub struct AddCalculatedFields {
    date_column: String,
}

impl Default for AddCalculatedFields {
    fn default() -> Self {
        Self {
            date_column: "date".to_owned(),
        }
    }
}

impl AddCalculatedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive date parts from another column than `date`.
    #[must_use]
    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = column.into();
        self
    }
}

type DatePart = (&'static str, fn(NaiveDateTime) -> u32);

const DATE_PARTS: [DatePart; 5] = [
    ("year", |d| d.year().unsigned_abs()),
    ("month", |d| d.month()),
    ("quarter", |d| (d.month() - 1) / 3 + 1),
    ("day_of_week", |d| d.weekday().num_days_from_monday()),
    ("week_of_year", |d| d.iso_week().week()),
];

impl TransformStep for AddCalculatedFields {
    fn name(&self) -> &'static str {
        "add_calculated_fields"
    }

    fn apply(&self, table: &Table) -> Result<StepOutput> {
        let mut out = table.clone();
        let mut fields_added: Vec<&str> = Vec::new();

        match table.column_kind(&self.date_column) {
            Some(ColumnKind::Date) => {
                let dates: Vec<Option<NaiveDateTime>> = table
                    .column_values(&self.date_column)
                    .map(|values| values.map(Value::as_date).collect())
                    .unwrap_or_default();
                for (name, part) in DATE_PARTS {
                    let values = dates
                        .iter()
                        .map(|d| d.map_or(Value::Null, |d| Value::number(f64::from(part(d)))))
                        .collect();
                    out.set_column(name, ColumnKind::Number, values)?;
                    fields_added.push(name);
                }
            }
            Some(kind) => tracing::warn!(
                "Column '{}' holds {kind} values, not dates; date fields skipped",
                self.date_column
            ),
            None => {}
        }

        let revenue = number_cells(table, "revenue");

        if table.has_column("revenue") && table.has_column("cost") {
            let cost = number_cells(table, "cost");
            let profit: Vec<Option<f64>> = revenue
                .iter()
                .zip(&cost)
                .map(|(r, c)| Some((*r)? - (*c)?))
                .collect();
            let margin = profit
                .iter()
                .zip(&revenue)
                .map(|(p, r)| match (p, r) {
                    (Some(p), Some(r)) if *r != 0.0 => Value::number(round2(p / r * 100.0)),
                    _ => Value::Null,
                })
                .collect();

            out.set_column(
                "profit",
                ColumnKind::Number,
                profit.into_iter().map(Value::from).collect(),
            )?;
            out.set_column("profit_margin", ColumnKind::Number, margin)?;
            fields_added.extend(["profit", "profit_margin"]);
        }

        if table.has_column("revenue") && table.has_column("units_sold") {
            let units = number_cells(table, "units_sold");
            let price = revenue
                .iter()
                .zip(&units)
                .map(|(r, u)| match (r, u) {
                    (Some(r), Some(u)) if *u != 0.0 => Value::number(round2(r / u)),
                    _ => Value::Null,
                })
                .collect();
            out.set_column("avg_unit_price", ColumnKind::Number, price)?;
            fields_added.push("avg_unit_price");
        }

        tracing::info!(
            "Added {} calculated fields: {}",
            fields_added.len(),
            fields_added.join(", ")
        );

        Ok(StepOutput::new(out).metric("fields_added", fields_added))
    }

    fn description(&self) -> String {
        format!(
            "Derive date parts from '{}' and profit/price fields",
            self.date_column
        )
    }
}
