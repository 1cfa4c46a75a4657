//! Logging setup for the `salesetl` binary.
//!
//! Logs go to the console and to daily-rotated files in the app data directory:
//!
//! - `salesetl.<date>.log`: everything at the configured level
//! - `error.<date>.log`: warnings and errors only
//!
//! The level defaults to `info` and can be overridden with `RUST_LOG`.
//!
//! ```no_run
//! salesetl::logging::init().expect("Failed to initialize logging");
//! tracing::info!("App started");
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const APP_DIR: &str = "salesetl";

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/salesetl/logs`
/// - macOS: `~/Library/Application Support/salesetl/logs`
/// - Linux: `~/.local/share/salesetl/logs`
///
/// # Errors
///
/// Fails if there is no data directory or the log directory cannot be created.
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;

    let log_dir = base_dir.join(APP_DIR).join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

/// Initializes console and file logging
///
/// Both files rotate daily, keeping 10 old files each.
///
/// # Errors
///
/// Returns error if log directory cannot be created or file appenders fail; the caller
/// may then fall back to plain console logging.
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(APP_DIR)
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create all-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create error-logs file appender")?;

    // Default to INFO, allow override with RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    // stdout carries command output
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized, log directory: {}", log_dir.display());

    Ok(())
}

/// Console-only logging through `env_logger`, used when [`init`] fails. Tracing
/// events reach it through tracing's `log` compatibility.
///
/// # Errors
///
/// Returns an error if a logger is already installed.
pub fn init_fallback() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init()
        .context("Failed to install console logger")
}

/// Gets the path to the current log file
///
/// # Errors
///
/// Fails if the log directory cannot be determined.
pub fn get_current_log_path() -> Result<PathBuf> {
    let log_dir = get_log_dir()?;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    Ok(log_dir.join(format!("{APP_DIR}.{today}.log")))
}
