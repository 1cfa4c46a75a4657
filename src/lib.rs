//! # salesetl - Sales Data ETL Library
//!
//! Reads sales CSV files from a raw bucket, cleans and enriches them, and writes
//! the result to a processed bucket.
//!
//! ## Quick Start
//!
//! ```no_run
//! use salesetl::pipeline::EtlPipeline;
//! use salesetl::store::DirBlobStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = DirBlobStore::open("data/raw")?;
//! let processed = DirBlobStore::create("data/processed")?;
//! let mut pipeline = EtlPipeline::new(raw, processed);
//!
//! let report = pipeline.run_pipeline("sales.csv", None, true)?;
//! println!("{}", report.summary());
//! if let Some(financial) = &report.financial {
//!     println!("{financial}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`table`]: In-memory typed table with CSV reading and writing
//! - [`transform`]: Cleaning, date normalisation, derived fields, filtering,
//!   aggregation and enrichment steps, plus the transformation log
//! - [`pipeline`]: Extract/transform/load runs and JSON pipeline specs
//! - [`store`]: Named blob buckets backed by a directory or memory
//! - [`config`]: Persistent run configuration
//! - [`error`]: Error kinds shared by every module
//! - [`logging`]: Console and rolling file logs for the binary
//!
//! ## Custom Pipelines
//!
//! Step lists can be written as JSON and run instead of the standard pipeline:
//!
//! ```
//! use salesetl::pipeline::PipelineSpec;
//!
//! let spec = PipelineSpec::from_json(r#"{
//!     "version": "0.1",
//!     "name": "by-category",
//!     "steps": [
//!         {"op": "clean"},
//!         {"op": "aggregate", "group_by": ["category"], "aggregations": {"revenue": "sum"}}
//!     ]
//! }"#)?;
//! assert_eq!(spec.build()?.len(), 2);
//! # Ok::<(), salesetl::error::EtlError>(())
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod table;
pub mod transform;
