use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use salesetl::config::EtlConfig;
use salesetl::error::EtlError;
use salesetl::pipeline::{EtlPipeline, PipelineSpec, RunFailure, RunReport};
use salesetl::store::{BlobStore as _, DirBlobStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "salesetl",
    version,
    about = "Clean, enrich and aggregate sales CSV files"
)]
pub struct Cli {
    /// Path to a JSON config file. Defaults to the platform config directory.
    #[arg(long, global = true, env = "SALESETL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Store locations that override the config file
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Directory holding raw input files
    #[arg(long, env = "SALESETL_RAW_DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Directory receiving processed files
    #[arg(long, env = "SALESETL_PROCESSED_DIR")]
    pub processed_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline over one raw file and store the result
    Run {
        /// Name of the file in the raw store
        input: String,

        /// Name for the processed file. Defaults to processed_<input>.
        #[arg(short, long)]
        output: Option<String>,

        /// Skip revenue rank and share columns
        #[arg(long)]
        no_stats: bool,

        /// Path to a JSON pipeline spec to run instead of the standard pipeline
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Print the run report as JSON instead of text
        #[arg(long)]
        summary_json: bool,

        #[command(flatten)]
        stores: StoreArgs,
    },
    /// List files in the raw store
    List {
        #[command(flatten)]
        stores: StoreArgs,
    },
    /// Check that both stores exist and show their contents
    Check {
        #[command(flatten)]
        stores: StoreArgs,
    },
}

pub fn run_command(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => EtlConfig::load(path)?,
        None => EtlConfig::load_default()?,
    };

    match cli.command {
        Commands::Run {
            input,
            output,
            no_stats,
            spec,
            summary_json,
            stores,
        } => {
            let config = apply_overrides(config, stores);
            let add_stats = config.add_stats && !no_stats;
            handle_run(
                config,
                &input,
                output.as_deref(),
                add_stats,
                spec.as_deref(),
                summary_json,
            )
        }
        Commands::List { stores } => handle_list(&apply_overrides(config, stores)),
        Commands::Check { stores } => Ok(handle_check(&apply_overrides(config, stores))),
    }
}

fn apply_overrides(config: EtlConfig, stores: StoreArgs) -> EtlConfig {
    config.with_overrides(stores.raw_dir, stores.processed_dir)
}

/// Why a `run` command failed: before the pipeline started, or inside it.
#[derive(Debug)]
enum RunError {
    Setup(EtlError),
    Pipeline(RunFailure),
}

impl RunError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Setup(err) => err.kind(),
            Self::Pipeline(failure) => failure.kind(),
        }
    }
}

fn handle_run(
    config: EtlConfig,
    input: &str,
    output: Option<&str>,
    add_stats: bool,
    spec_path: Option<&Path>,
    summary_json: bool,
) -> Result<ExitCode> {
    match execute_run(config, input, output, add_stats, spec_path) {
        Ok(report) => {
            print_report(&report, summary_json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(RunError::Setup(err)) => Ok(report_error(&err)),
        Err(RunError::Pipeline(failure)) => Ok(report_failure(&failure)),
    }
}

fn execute_run(
    config: EtlConfig,
    input: &str,
    output: Option<&str>,
    add_stats: bool,
    spec_path: Option<&Path>,
) -> std::result::Result<RunReport, RunError> {
    let setup = || -> salesetl::error::Result<_> {
        let raw = DirBlobStore::open(&config.raw_store_dir)?;
        let processed = DirBlobStore::create(&config.processed_store_dir)?;
        let spec = match spec_path {
            Some(path) => PipelineSpec::from_file(path)?,
            None => PipelineSpec::standard(&config, add_stats),
        };
        Ok((raw, processed, spec))
    };
    let (raw, processed, spec) = setup().map_err(RunError::Setup)?;

    let mut pipeline = EtlPipeline::with_config(raw, processed, config);
    pipeline
        .run_spec(&spec, input, output)
        .map_err(RunError::Pipeline)
}

fn print_report(report: &RunReport, as_json: bool) -> Result<()> {
    if as_json {
        let json = serde_json::to_string_pretty(&report.to_json())
            .context("Failed to serialize run report")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", report.summary());
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    println!("Records processed: {}", report.rows_after());
    println!("Total columns: {}", report.columns_after());
    if let Some(financial) = &report.financial {
        println!();
        println!("{financial}");
    }
    Ok(())
}

fn report_error(err: &EtlError) -> ExitCode {
    eprintln!("ETL PIPELINE FAILED");
    eprintln!("Error Type: {}", err.kind());
    eprintln!("Error Message: {err}");
    ExitCode::FAILURE
}

fn report_failure(failure: &RunFailure) -> ExitCode {
    let code = report_error(&failure.error);
    eprintln!("Phase: {}", failure.phase);
    let completed = failure.completed_steps();
    if !completed.is_empty() {
        eprintln!("Completed steps: {}", completed.join(", "));
    }
    code
}

fn handle_list(config: &EtlConfig) -> Result<ExitCode> {
    let store = match DirBlobStore::open(&config.raw_store_dir) {
        Ok(store) => store,
        Err(err) => return Ok(report_error(&err)),
    };
    let files = match store.list() {
        Ok(files) => files,
        Err(err) => return Ok(report_error(&err)),
    };

    println!("Available files in {}:", store.location());
    for file in files {
        println!("  • {file}");
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_check(config: &EtlConfig) -> ExitCode {
    let mut all_present = true;

    for (label, dir) in [
        ("raw", &config.raw_store_dir),
        ("processed", &config.processed_store_dir),
    ] {
        match DirBlobStore::open(dir).and_then(|store| store.list()) {
            Ok(files) => {
                println!("Bucket exists ({label}): {}", dir.display());
                println!("  Files: {}", files.len());
                for file in files {
                    println!("    • {file}");
                }
            }
            Err(err) => {
                all_present = false;
                println!("Bucket NOT found ({label}): {} ({err})", dir.display());
            }
        }
    }

    if all_present {
        println!("Setup looks good.");
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
