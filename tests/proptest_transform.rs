//! Property-based tests for tables and transformation steps using proptest.

use chrono::{Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;

use salesetl::table::{Table, Value, csv_io};
use salesetl::transform::{AggOp, CleanData, DataTransformer};

fn sales_rows() -> impl Strategy<Value = Vec<(u8, Option<i32>, i32)>> {
    prop::collection::vec((0u8..4, prop::option::of(-500i32..5000), 0i32..3000), 0..40)
}

fn build_table(rows: &[(u8, Option<i32>, i32)]) -> Table {
    let rows = rows
        .iter()
        .map(|(category, revenue, cost)| {
            vec![
                Value::text(format!("cat{category}")),
                Value::from(revenue.map(f64::from)),
                Value::number(f64::from(*cost)),
            ]
        })
        .collect();
    Table::infer(&["category", "revenue", "cost"], rows).expect("valid table")
}

// --- CSV codec properties ---

const PRODUCTS: &[&str] = &["Radio", "TV, 55\"", "say \"hi\"", "two\nlines", " padded "];

type CodecRow = (Option<usize>, Option<i32>, u8, Option<(u16, Option<u32>)>);

fn codec_rows() -> impl Strategy<Value = Vec<CodecRow>> {
    prop::collection::vec(
        (
            prop::option::of(0..PRODUCTS.len()),
            prop::option::of(-500_000i32..500_000),
            0u8..4,
            prop::option::of((0u16..3000, prop::option::of(0u32..86_400))),
        ),
        1..40,
    )
}

/// Table with text, number and date columns; columns with no values are left out.
fn build_codec_table(rows: &[CodecRow]) -> Table {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .expect("valid date")
        .and_time(NaiveTime::MIN);
    let cells: Vec<Vec<Value>> = rows
        .iter()
        .map(|(product, cents, category, date)| {
            vec![
                Value::from(product.map(|idx| PRODUCTS[idx])),
                Value::from(cents.map(|c| f64::from(c) / 100.0)),
                Value::text(format!("cat{category}")),
                Value::from(date.map(|(days, secs)| {
                    start
                        + Duration::days(i64::from(days))
                        + Duration::seconds(i64::from(secs.unwrap_or(0)))
                })),
            ]
        })
        .collect();

    let names = ["product", "revenue", "category", "date"];
    let keep: Vec<usize> = (0..names.len())
        .filter(|&idx| cells.iter().any(|row| !row[idx].is_null()))
        .collect();
    let kept_names: Vec<&str> = keep.iter().map(|&idx| names[idx]).collect();
    let kept_rows = cells
        .into_iter()
        .map(|row| keep.iter().map(|&idx| row[idx].clone()).collect())
        .collect();
    Table::infer(&kept_names, kept_rows).expect("valid table")
}

proptest! {
    #[test]
    fn csv_round_trip_preserves_table(rows in codec_rows()) {
        let table = build_codec_table(&rows);
        let bytes = csv_io::serialize(&table).unwrap();
        let parsed = csv_io::parse(&bytes).unwrap();

        prop_assert_eq!(parsed, table);
    }
}

// --- Cleaning properties ---

proptest! {
    #[test]
    fn clean_is_idempotent(rows in sales_rows()) {
        let step = CleanData::new();
        let once = step.execute(&build_table(&rows)).table;
        let twice = step.execute(&once).table;
        prop_assert_eq!(twice.rows(), once.rows());
    }

    #[test]
    fn clean_never_keeps_null_revenue(rows in sales_rows()) {
        let table = build_table(&rows);
        let cleaned = CleanData::new().execute(&table).table;

        prop_assert!(cleaned.row_count() <= table.row_count());
        prop_assert_eq!(cleaned.numbers("revenue").len(), cleaned.row_count());
    }
}

// --- Filter properties ---

proptest! {
    #[test]
    fn filter_keeps_exactly_matching_rows(rows in sales_rows(), threshold in -500i32..5000) {
        let table = build_table(&rows);
        let condition = format!(">{threshold}");
        let mut transformer = DataTransformer::new();
        let filtered = transformer
            .filter_data(&table, &[("revenue", condition.as_str())])
            .unwrap();

        let expected = table
            .numbers("revenue")
            .into_iter()
            .filter(|r| *r > f64::from(threshold))
            .count();
        prop_assert_eq!(filtered.row_count(), expected);
        prop_assert!(filtered.numbers("revenue").iter().all(|r| *r > f64::from(threshold)));
    }
}

// --- Aggregation properties ---

proptest! {
    #[test]
    fn aggregate_counts_sum_to_row_count(rows in sales_rows()) {
        let table = build_table(&rows);
        let mut transformer = DataTransformer::new();
        let out = transformer
            .aggregate_data(&table, &["category"], &[("cost", AggOp::Count)])
            .unwrap();

        let total: f64 = out.numbers("cost").iter().sum();
        prop_assert_eq!(total as usize, table.row_count());
        prop_assert!(out.row_count() <= 4);
    }

    #[test]
    fn aggregate_sums_match_manual_totals(rows in sales_rows()) {
        let table = build_table(&rows);
        let mut transformer = DataTransformer::new();
        let out = transformer
            .aggregate_data(&table, &["category"], &[("cost", AggOp::Sum)])
            .unwrap();

        let grouped: f64 = out.numbers("cost").iter().sum();
        let direct: f64 = table.numbers("cost").iter().sum();
        prop_assert!((grouped - direct).abs() < 1e-6);
    }
}
