//! Injected logging and telemetry.
//!
//! Workers and the coordinator never reach for process-wide logging state of their own;
//! they report through a [`Telemetry`] handed to them by the caller. The default
//! [`LogTelemetry`] turns those events into `tracing` records and feeds
//! [`SearchMetrics`]. Process workers forward the same events over their pipe and the
//! parent replays them here, so every diagnostic is emitted exactly once.
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::SearchError;
use crate::metrics::SearchMetrics;
use crate::results::RunReport;

/// Receiver for per-file and per-run events
pub trait Telemetry: Send + Sync {
    /// A file was read and matched; `matched` keywords were found in it
    fn file_scanned(&self, worker: usize, path: &Path, bytes: usize, matched: usize);

    /// A file could not be read and contributes no matches
    fn file_failed(&self, worker: usize, path: &Path, error: &SearchError);

    /// Every worker has joined
    fn run_completed(&self, _report: &RunReport) {}
}

/// Telemetry that writes `tracing` events
#[derive(Debug, Clone, Default)]
pub struct LogTelemetry {
    metrics: Arc<SearchMetrics>,
}

impl LogTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares counters with another component, typically the pattern matcher
    pub fn with_metrics(metrics: Arc<SearchMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }
}

impl Telemetry for LogTelemetry {
    fn file_scanned(&self, worker: usize, path: &Path, bytes: usize, matched: usize) {
        self.metrics
            .record_file_scanned(bytes as u64, matched as u64);
        info!(worker, "Processing file: {} ({} keywords)", path.display(), matched);
    }

    fn file_failed(&self, worker: usize, path: &Path, err: &SearchError) {
        match err {
            SearchError::FileNotFound(_) => {
                self.metrics.record_file_failed(true);
                error!(worker, "File not found: {}", path.display());
            }
            other => {
                self.metrics.record_file_failed(false);
                error!(worker, "Error processing file {}: {}", path.display(), other);
            }
        }
    }

    fn run_completed(&self, report: &RunReport) {
        info!(
            "Execution time ({} x {}): {}",
            report.workers,
            report.model,
            humantime::format_duration(report.elapsed)
        );
        self.metrics.log_stats();
    }
}
