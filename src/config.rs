//! Persistent configuration for pipeline runs.
//!
//! Stored as JSON at `<config_dir>/salesetl/config.json`. Every field has a default, so
//! a partial (or missing) file is fine; command-line flags and the `SALESETL_RAW_DIR` /
//! `SALESETL_PROCESSED_DIR` environment variables override what the file says.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transform::enrich::DEFAULT_PROCESSING_VERSION;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Directory backing the raw (input) bucket
    pub raw_store_dir: PathBuf,
    /// Directory backing the processed (output) bucket
    pub processed_store_dir: PathBuf,
    /// Columns whose nulls drop a row during cleaning; `None` means `revenue`
    pub critical_columns: Option<Vec<String>>,
    /// Columns normalised to dates before fields are derived
    pub date_columns: Vec<String>,
    /// Value stamped into `processing_version`
    pub processing_version: String,
    /// Whether runs add revenue rank and share columns by default
    pub add_stats: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("salesetl");
        Self {
            raw_store_dir: base.join("raw"),
            processed_store_dir: base.join("processed"),
            critical_columns: None,
            date_columns: vec!["date".to_owned()],
            processing_version: DEFAULT_PROCESSING_VERSION.to_owned(),
            add_stats: true,
        }
    }
}

impl EtlConfig {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Fails when the platform has no config directory.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("salesetl").join("config.json"))
    }

    /// Load configuration from the default location, or defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        Self::load(Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Replace store directories with any that were given explicitly.
    #[must_use]
    pub fn with_overrides(mut self, raw: Option<PathBuf>, processed: Option<PathBuf>) -> Self {
        if let Some(raw) = raw {
            self.raw_store_dir = raw;
        }
        if let Some(processed) = processed {
            self.processed_store_dir = processed;
        }
        self
    }

    /// Critical columns as borrowed names, if configured.
    pub fn critical_column_names(&self) -> Option<Vec<&str>> {
        self.critical_columns
            .as_ref()
            .map(|cols| cols.iter().map(String::as_str).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = EtlConfig::load(dir.path().join("absent.json")).expect("defaults");
        assert_eq!(config, EtlConfig::default());
        assert_eq!(config.processing_version, "v1.0");
        assert!(config.add_stats);
    }

    #[test]
    fn test_partial_file_and_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, r#"{"critical_columns": ["revenue", "cost"], "add_stats": false}"#)
            .expect("write");

        let config = EtlConfig::load(&path).expect("load");
        assert_eq!(config.critical_column_names(), Some(vec!["revenue", "cost"]));
        assert!(!config.add_stats);
        assert_eq!(config.date_columns, vec!["date"]);

        config.save(&path).expect("save");
        assert_eq!(EtlConfig::load(&path).expect("reload"), config);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").expect("write");
        let err = EtlConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }

    #[test]
    fn test_overrides() {
        let config = EtlConfig::default()
            .with_overrides(Some(PathBuf::from("/data/in")), None);
        assert_eq!(config.raw_store_dir, PathBuf::from("/data/in"));
        assert_eq!(config.processed_store_dir, EtlConfig::default().processed_store_dir);
    }

    #[test]
    fn test_config_path() {
        if let Ok(path) = EtlConfig::config_path() {
            assert!(path.ends_with("salesetl/config.json") || path.ends_with("salesetl\\config.json"));
        }
    }
}
