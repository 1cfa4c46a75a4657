//! Extract, transform and load runs over blob stores.
//!
//! A run reads one CSV blob from a raw [`BlobStore`](crate::store::BlobStore), passes
//! the parsed table through an ordered list of steps and writes the result to a
//! processed store. Steps come either from the standard sales pipeline or from a
//! versioned JSON [`PipelineSpec`].
//!
//! # Example
//!
//! ```
//! use salesetl::pipeline::EtlPipeline;
//! use salesetl::store::MemoryBlobStore;
//!
//! let raw = MemoryBlobStore::new("raw").with_blob(
//!     "sales.csv",
//!     "date,revenue,cost\n2024-01-01,1000,600\n2024-01-02,1500,900\n",
//! );
//! let mut pipeline = EtlPipeline::new(raw, MemoryBlobStore::new("processed"));
//!
//! let report = pipeline.run_pipeline("sales.csv", None, true)?;
//! assert_eq!(report.rows_after(), 2);
//! assert!(report.table.has_column("revenue_rank"));
//! assert_eq!(report.output_location, "memory:processed/processed_sales.csv");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Failures
//!
//! The first failing step aborts the run and nothing is written. The returned
//! [`RunFailure`] names the phase, carries the error (whose
//! [`kind`](crate::error::EtlError::kind) is stable) and the log of the steps that
//! completed before it.

pub mod executor;
pub mod extract;
pub mod load;
pub mod spec;
pub mod validation;

pub use executor::{EtlPipeline, FinancialSummary, RunFailure, RunPhase, RunReport};
pub use extract::DataExtractor;
pub use load::DataLoader;
pub use spec::{PipelineSpec, SPEC_VERSION, Step};
pub use validation::{ValidationError, validate_pipeline};
