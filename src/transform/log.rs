//! Append-only audit log of step executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step-specific metrics, e.g. `duplicates_removed` or `reduction_percent`.
/// Keys keep insertion order.
pub type Metrics = serde_json::Map<String, serde_json::Value>;

/// One executed step. Entries are created once and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformLogEntry {
    step: String,
    timestamp: DateTime<Utc>,
    metrics: Metrics,
}

impl TransformLogEntry {
    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shortcut for a single metric.
    pub fn metric(&self, key: &str) -> Option<&serde_json::Value> {
        self.metrics.get(key)
    }
}

/// Ordered record of the steps of one run.
#[derive(Debug, Clone)]
pub struct TransformLog {
    entries: Vec<TransformLogEntry>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl TransformLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub(crate) fn record(&mut self, step: impl Into<String>, metrics: Metrics) {
        self.entries.push(TransformLogEntry {
            step: step.into(),
            timestamp: Utc::now(),
            metrics,
        });
    }

    pub fn entries(&self) -> &[TransformLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Snapshot of the log. Duration runs from log creation to this call on the
    /// monotonic clock.
    pub fn summary(&self) -> TransformSummary {
        let elapsed = self.started.elapsed().as_secs_f64();
        TransformSummary {
            total_transformations: self.entries.len(),
            duration_seconds: (elapsed * 100.0).round() / 100.0,
            start_time: self.started_at,
            end_time: Utc::now(),
            transformations: self.entries.clone(),
        }
    }
}

impl Default for TransformLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`TransformLog::summary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSummary {
    pub total_transformations: usize,
    pub duration_seconds: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub transformations: Vec<TransformLogEntry>,
}

impl TransformSummary {
    /// Names of the executed steps, in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.transformations.iter().map(TransformLogEntry::step).collect()
    }
}
