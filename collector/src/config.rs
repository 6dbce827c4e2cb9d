//! Backfill configuration

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use shared::config::env_or;
use shared::exchange::MAX_KLINES_PER_REQUEST;
use shared::{Backoff, Timeframe};

use crate::error::CollectorError;
use crate::Result;

/// Start used when neither a checkpoint nor an explicit start date exists.
pub fn default_start_date() -> DateTime<Utc> {
    // 2020-01-01T00:00:00Z
    Utc.timestamp_opt(1_577_836_800, 0).single().unwrap_or_default()
}

/// Parameters of one backfill run.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Market symbol, e.g. "BTC/USDT"
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Used only when no checkpoint exists
    pub start_date: Option<DateTime<Utc>>,
    /// Exclusive end; `None` means the time the run starts
    pub end_date: Option<DateTime<Utc>>,
    /// Candles requested per call
    pub batch_limit: u32,
    /// Consecutive failures before a window is skipped
    pub max_retries: u32,
    /// Intervals jumped over on an empty or unrecoverable window
    pub skip_intervals: i32,
    pub backoff: Backoff,
}

impl BackfillConfig {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            start_date: None,
            end_date: None,
            batch_limit: 1000,
            max_retries: 5,
            skip_intervals: 1000,
            backoff: Backoff::default(),
        }
    }

    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_batch_limit(mut self, batch_limit: u32) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Forward jump for empty or abandoned windows.
    pub fn skip(&self) -> chrono::Duration {
        self.timeframe.span(self.skip_intervals)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(CollectorError::Config("symbol must not be empty".to_string()));
        }
        if self.batch_limit == 0 || self.batch_limit > MAX_KLINES_PER_REQUEST {
            return Err(CollectorError::Config(format!(
                "batch limit must be within 1..={}, got {}",
                MAX_KLINES_PER_REQUEST, self.batch_limit
            )));
        }
        if self.max_retries == 0 {
            return Err(CollectorError::Config("max retries must be at least 1".to_string()));
        }
        if self.skip_intervals <= 0 {
            return Err(CollectorError::Config("skip interval count must be positive".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CollectorError::Config(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

/// Collector process settings read from the environment.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub backfill: BackfillConfig,
    pub progress_file: PathBuf,
}

impl CollectorSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let symbol = std::env::var("COLLECTOR_SYMBOL").unwrap_or_else(|_| "BTC/USDT".to_string());
        let timeframe: Timeframe = env_or("COLLECTOR_INTERVAL", Timeframe::M1)?;

        let mut backfill = BackfillConfig::new(symbol, timeframe)
            .with_batch_limit(env_or("COLLECTOR_BATCH_LIMIT", 1000)?)
            .with_max_retries(env_or("COLLECTOR_MAX_RETRIES", 5)?);
        if let Ok(raw) = std::env::var("COLLECTOR_START_DATE") {
            if !raw.trim().is_empty() {
                backfill = backfill.with_start_date(parse_date(&raw)?);
            }
        }
        backfill.validate()?;

        Ok(Self {
            backfill,
            progress_file: std::env::var("PROGRESS_FILE")
                .unwrap_or_else(|_| "progress/collection_progress.json".to_string())
                .into(),
        })
    }
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CollectorError::Config(format!("invalid date: {:?}", raw)))
}
