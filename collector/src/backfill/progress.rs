//! Progress reporting seam

use tracing::info;

/// Receives human-readable progress lines from the backfill loop.
pub trait ProgressSink: Send + Sync {
    fn log_progress(&self, message: &str);
}

/// Writes progress through `tracing` at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn log_progress(&self, message: &str) {
        info!(target: "collector::progress", "{}", message);
    }
}
