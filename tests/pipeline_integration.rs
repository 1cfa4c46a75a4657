//! Integration tests for full ETL runs
//!
//! These tests run complete pipelines against memory and directory stores and verify
//! the written output and the run reports.

use salesetl::pipeline::{EtlPipeline, PipelineSpec, RunPhase};
use salesetl::store::{BlobStore as _, DirBlobStore, MemoryBlobStore};
use salesetl::table::{Table, Value, csv_io};
use salesetl::transform::{AggOp, DataTransformer};

const FIXTURE: &str = include_str!("../testdata/sales.csv");

fn sales_table() -> Table {
    csv_io::parse(FIXTURE.as_bytes()).expect("fixture parses")
}

fn revenue_cost_table() -> Table {
    let rows = [
        (Some(1000.0), 600.0),
        (Some(1500.0), 900.0),
        (Some(1000.0), 600.0),
        (Some(800.0), 500.0),
        (None, 400.0),
    ]
    .into_iter()
    .map(|(revenue, cost)| vec![Value::from(revenue), Value::number(cost)])
    .collect();
    Table::infer(&["revenue", "cost"], rows).expect("table")
}

#[test]
fn test_clean_then_calculated_fields() {
    let mut transformer = DataTransformer::new();
    let cleaned = transformer.clean_data(&revenue_cost_table());
    assert_eq!(cleaned.row_count(), 3, "duplicate and null-revenue rows removed");

    let enriched = transformer.add_calculated_fields(&cleaned).unwrap();
    assert_eq!(enriched.numbers("profit"), vec![400.0, 600.0, 300.0]);
    assert_eq!(enriched.numbers("profit_margin"), vec![40.0, 40.0, 37.5]);

    let summary = transformer.get_summary();
    assert_eq!(summary.step_names(), vec!["clean_data", "add_calculated_fields"]);
}

#[test]
fn test_filter_on_cleaned_table() {
    let mut transformer = DataTransformer::new();
    let cleaned = transformer.clean_data(&revenue_cost_table());
    let filtered = transformer
        .filter_data(&cleaned, &[("revenue", ">900")])
        .unwrap();

    assert_eq!(filtered.row_count(), 2);
    assert_eq!(filtered.numbers("revenue"), vec![1000.0, 1500.0]);
}

#[test]
fn test_aggregate_by_category() {
    let table = Table::infer(
        &["category", "revenue"],
        vec![
            vec![Value::text("Clothing"), Value::number(800.0)],
            vec![Value::text("Electronics"), Value::number(1000.0)],
            vec![Value::text("Electronics"), Value::number(1500.0)],
        ],
    )
    .unwrap();

    let mut transformer = DataTransformer::new();
    let out = transformer
        .aggregate_data(&table, &["category"], &[("revenue", AggOp::Sum)])
        .unwrap();

    assert_eq!(out.row_count(), 2);
    assert_eq!(out.value(0, "category"), Some(&Value::text("Clothing")));
    assert_eq!(out.numbers("revenue"), vec![800.0, 2500.0]);
}

#[test]
fn test_standard_run_with_memory_stores() {
    let raw = MemoryBlobStore::new("raw").with_blob("sales.csv", FIXTURE);
    let mut pipeline = EtlPipeline::new(raw, MemoryBlobStore::new("processed"));

    let report = pipeline
        .run_pipeline("sales.csv", Some("clean_sales.csv"), true)
        .expect("run succeeds");

    assert_eq!(report.rows_before, 7);
    assert_eq!(report.rows_after(), 5);
    assert_eq!(report.output_location, "memory:processed/clean_sales.csv");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    for column in [
        "year",
        "month",
        "quarter",
        "profit",
        "profit_margin",
        "avg_unit_price",
        "revenue_rank",
        "revenue_percentage",
        "processed_timestamp",
        "processing_version",
    ] {
        assert!(report.table.has_column(column), "missing {column}");
    }

    let written = pipeline
        .processed_store()
        .get("clean_sales.csv")
        .expect("output written");
    let reloaded = csv_io::parse(written).expect("output parses");
    assert_eq!(reloaded.row_count(), 5);
    assert_eq!(reloaded.column_names(), report.table.column_names());

    let financial = report.financial.expect("financial summary");
    assert!((financial.total_revenue - 4800.0).abs() < 1e-9);
    assert!((financial.total_profit - 1980.0).abs() < 1e-9);
}

#[test]
fn test_spec_run_with_dir_stores() {
    let root = tempfile::tempdir().unwrap();
    let raw_dir = root.path().join("raw");
    std::fs::create_dir_all(&raw_dir).unwrap();
    std::fs::write(raw_dir.join("sales.csv"), FIXTURE).unwrap();

    let spec_path = root.path().join("by_category.json");
    std::fs::write(
        &spec_path,
        r#"{
            "version": "0.1",
            "name": "big sales by category",
            "steps": [
                { "op": "clean" },
                { "op": "filter", "conditions": { "revenue": ">900" } },
                { "op": "aggregate", "group_by": ["category"],
                  "aggregations": { "revenue": "sum", "units_sold": "count" } }
            ]
        }"#,
    )
    .unwrap();
    let spec = PipelineSpec::from_file(&spec_path).unwrap();

    let raw = DirBlobStore::open(&raw_dir).unwrap();
    let processed = DirBlobStore::create(root.path().join("processed")).unwrap();
    let mut pipeline = EtlPipeline::new(raw, processed);

    let report = pipeline.run_spec(&spec, "sales.csv", None).unwrap();
    assert_eq!(report.rows_after(), 2);
    assert_eq!(
        report.table.column_names(),
        vec!["category", "revenue", "units_sold"]
    );
    assert_eq!(report.table.numbers("revenue"), vec![2500.0, 1200.0]);
    assert_eq!(report.table.numbers("units_sold"), vec![2.0, 1.0]);

    let filter_entry = &report.transformations.transformations[1];
    assert_eq!(filter_entry.step(), "filter_data");
    assert_eq!(filter_entry.metric("rows_filtered"), Some(&serde_json::json!(2)));

    let out_path = root.path().join("processed").join("processed_sales.csv");
    let bytes = std::fs::read(&out_path).unwrap();
    assert_eq!(csv_io::parse(&bytes).unwrap().row_count(), 2);
    assert_eq!(
        pipeline.processed_store().list().unwrap(),
        vec!["processed_sales.csv"]
    );
}

#[test]
fn test_invalid_condition_fails_before_extract() {
    let spec = PipelineSpec::from_json(
        r#"{"version":"0.1","name":"bad","steps":[
            {"op":"filter","conditions":{"revenue":"~900"}}]}"#,
    )
    .unwrap();
    let mut pipeline = EtlPipeline::new(
        MemoryBlobStore::new("raw"),
        MemoryBlobStore::new("processed"),
    );

    let failure = pipeline.run_spec(&spec, "missing.csv", None).unwrap_err();
    assert_eq!(failure.kind(), "InvalidConditionError");
    assert_eq!(failure.phase, RunPhase::Transform);
    assert!(pipeline.processed_store().is_empty());
}

#[test]
fn test_malformed_csv_is_a_parse_error() {
    let raw = MemoryBlobStore::new("raw").with_blob("broken.csv", "a,b\n1,2,3\n");
    let mut pipeline = EtlPipeline::new(raw, MemoryBlobStore::new("processed"));

    let failure = pipeline.run_pipeline("broken.csv", None, true).unwrap_err();
    assert_eq!(failure.kind(), "ParseError");
    assert_eq!(failure.phase, RunPhase::Extract);
}

#[test]
fn test_validation_warnings_for_missing_columns() {
    let raw = MemoryBlobStore::new("raw").with_blob("sales.csv", FIXTURE);
    let spec = PipelineSpec::from_json(
        r#"{"version":"0.1","name":"w","steps":[
            {"op":"filter","conditions":{"store":"==Main"}}]}"#,
    )
    .unwrap();
    let mut pipeline = EtlPipeline::new(raw, MemoryBlobStore::new("processed"));

    let report = pipeline.run_spec(&spec, "sales.csv", None).unwrap();
    assert_eq!(report.rows_after(), 7, "absent filter column is ignored");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Step 1"));
}

#[test]
fn test_fixture_shape() {
    let table = sales_table();
    assert_eq!(table.row_count(), 7);
    assert_eq!(table.column_count(), 7);
    assert_eq!(table.null_count(), 1);
}
