//! Resumable historical backfill loop
//!
//! One sequential loop per symbol. Every iteration either stores a batch and
//! advances past it, skips an empty window, or records a failure and backs
//! off. Every request, empty or not, is followed by at least the source's
//! minimum request interval. The checkpoint is written only after a batch is durably upserted, so
//! an interrupted or crashed run re-fetches at most the in-flight batch
//! (at-least-once delivery, made harmless by the idempotent upsert).

pub mod progress;
pub mod sleeper;

pub use progress::*;
pub use sleeper::*;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::Shutdown;
use tracing::{debug, error, info, warn};

use crate::config::{default_start_date, BackfillConfig};
use crate::data::{CandleStore, CheckpointStore};
use crate::exchange::CandleSource;
use crate::Result;

/// Outcome of one fetch-and-store step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The source had nothing for the requested window.
    Empty,
    /// `records` candles stored; `batch_end` is the last open time.
    Stored {
        records: usize,
        batch_end: DateTime<Utc>,
    },
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    /// First window start of this run
    pub started_at: DateTime<Utc>,
    /// Where the run stopped; the next window start
    pub stopped_at: DateTime<Utc>,
    pub records_written: usize,
    pub batches: usize,
    /// Windows jumped over (empty or retries exhausted)
    pub skipped_windows: usize,
    pub failures: usize,
    /// Last checkpoint written during this run
    pub last_checkpoint: Option<DateTime<Utc>>,
    pub interrupted: bool,
}

impl BackfillSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            stopped_at: started_at,
            records_written: 0,
            batches: 0,
            skipped_windows: 0,
            failures: 0,
            last_checkpoint: None,
            interrupted: false,
        }
    }
}

pub struct Backfill {
    config: BackfillConfig,
    source: Arc<dyn CandleSource>,
    store: Arc<dyn CandleStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    progress: Arc<dyn ProgressSink>,
    sleeper: Arc<dyn Sleeper>,
    shutdown: Shutdown,
}

impl Backfill {
    pub fn new(
        config: BackfillConfig,
        source: Arc<dyn CandleSource>,
        store: Arc<dyn CandleStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            config,
            source,
            store,
            checkpoints,
            progress: Arc::new(TracingProgress),
            sleeper: Arc::new(ShutdownSleeper::new(shutdown.clone())),
            shutdown,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &BackfillConfig {
        &self.config
    }

    /// First window start: one interval past the checkpoint, else the
    /// configured start date, else [`default_start_date`].
    pub async fn resolve_start(&self) -> DateTime<Utc> {
        match self.checkpoints.read_checkpoint().await {
            Ok(Some(last_date)) => {
                info!("Resuming from checkpoint {}", last_date);
                return last_date + self.config.timeframe.duration();
            }
            Ok(None) => {}
            Err(e) => {
                error!("Error loading progress, starting from configured date: {}", e);
            }
        }
        self.config.start_date.unwrap_or_else(default_start_date)
    }

    /// Backfill up to the configured end date, or now.
    pub async fn run(&self) -> BackfillSummary {
        let end_date = self.config.end_date.unwrap_or_else(Utc::now);
        self.run_until(end_date).await
    }

    pub async fn run_until(&self, end_date: DateTime<Utc>) -> BackfillSummary {
        let interval = self.config.timeframe.duration();
        let skip = self.config.skip();
        let max_retries = self.config.max_retries;

        let mut current_date = self.resolve_start().await;
        let mut summary = BackfillSummary::new(current_date);
        let mut retry_count: u32 = 0;

        info!(
            symbol = %self.config.symbol,
            interval = %self.config.timeframe,
            "Starting data collection from {} to {}",
            current_date,
            end_date
        );

        while current_date < end_date {
            if self.shutdown.is_triggered() {
                summary.interrupted = true;
                break;
            }

            let wait = match self.fetch_and_store(current_date).await {
                Ok(BatchOutcome::Empty) => {
                    warn!("No data available for {}", current_date);
                    current_date += skip;
                    summary.skipped_windows += 1;
                    self.source.min_request_interval()
                }
                Ok(BatchOutcome::Stored { records, batch_end }) => {
                    summary.records_written += records;
                    summary.batches += 1;
                    summary.last_checkpoint = Some(batch_end);

                    info!(
                        "Saved {} records up to {}. Total: {}",
                        records, batch_end, summary.records_written
                    );
                    self.progress
                        .log_progress(&format!("Progress: {} / {}", batch_end, end_date));

                    let next = batch_end + interval;
                    current_date = if next > current_date {
                        next
                    } else {
                        // Source answered with candles behind the window
                        warn!(
                            "Batch ending at {} does not advance past {}, stepping one interval",
                            batch_end, current_date
                        );
                        current_date + interval
                    };
                    retry_count = 0;
                    self.source.min_request_interval()
                }
                Err(e) => {
                    retry_count += 1;
                    summary.failures += 1;
                    let wait = self.config.backoff.delay(retry_count);

                    error!(
                        window_start = %current_date,
                        retry = retry_count,
                        max_retries,
                        kind = e.kind(),
                        "Error fetching data for {}: {}",
                        current_date,
                        e
                    );
                    self.progress.log_progress(&format!(
                        "Retry {}/{} after {} seconds...",
                        retry_count,
                        max_retries,
                        wait.as_secs()
                    ));

                    if retry_count >= max_retries {
                        error!(
                            window_start = %current_date,
                            "Max retries reached, skipping to next batch"
                        );
                        current_date += skip;
                        summary.skipped_windows += 1;
                        retry_count = 0;
                    }
                    wait
                }
            };

            if let Err(e) = self.sleeper.sleep(wait).await {
                debug!("Wait cut short: {}", e);
                summary.interrupted = true;
                break;
            }
        }

        summary.stopped_at = current_date;
        if summary.interrupted {
            info!(
                "Data collection interrupted at {}. Progress saved up to {:?}",
                current_date, summary.last_checkpoint
            );
        } else {
            info!(
                "Data collection reached {}. Total records saved: {}",
                end_date, summary.records_written
            );
        }
        summary
    }

    /// Fetch one window, upsert it, then move the checkpoint.
    async fn fetch_and_store(&self, current_date: DateTime<Utc>) -> Result<BatchOutcome> {
        let candles = self
            .source
            .fetch_candles(
                &self.config.symbol,
                self.config.timeframe,
                current_date,
                self.config.batch_limit,
            )
            .await?;

        let Some(batch_end) = candles.iter().map(|c| c.timestamp).max() else {
            return Ok(BatchOutcome::Empty);
        };

        self.store.upsert_candles(&candles).await?;
        self.checkpoints.write_checkpoint(batch_end).await?;

        Ok(BatchOutcome::Stored {
            records: candles.len(),
            batch_end,
        })
    }
}
