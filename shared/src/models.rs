//! OHLCV candle data structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// OHLCV candle, identified by its open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the interval
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Candle interval in exchange notation ("1m", "1h", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M3 => "3m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::H6 => "6h",
            Self::H8 => "8h",
            Self::H12 => "12h",
            Self::D1 => "1d",
            Self::D3 => "3d",
            Self::W1 => "1w",
        }
    }

    /// Length of one interval unit.
    pub fn duration(&self) -> Duration {
        match self {
            Self::M1 => Duration::minutes(1),
            Self::M3 => Duration::minutes(3),
            Self::M5 => Duration::minutes(5),
            Self::M15 => Duration::minutes(15),
            Self::M30 => Duration::minutes(30),
            Self::H1 => Duration::hours(1),
            Self::H2 => Duration::hours(2),
            Self::H4 => Duration::hours(4),
            Self::H6 => Duration::hours(6),
            Self::H8 => Duration::hours(8),
            Self::H12 => Duration::hours(12),
            Self::D1 => Duration::days(1),
            Self::D3 => Duration::days(3),
            Self::W1 => Duration::weeks(1),
        }
    }

    /// Duration of `units` consecutive intervals.
    pub fn span(&self, units: i32) -> Duration {
        self.duration() * units
    }
}

impl FromStr for Timeframe {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let timeframe = match s.trim() {
            "1m" => Self::M1,
            "3m" => Self::M3,
            "5m" => Self::M5,
            "15m" => Self::M15,
            "30m" => Self::M30,
            "1h" => Self::H1,
            "2h" => Self::H2,
            "4h" => Self::H4,
            "6h" => Self::H6,
            "8h" => Self::H8,
            "12h" => Self::H12,
            "1d" => Self::D1,
            "3d" => Self::D3,
            "1w" => Self::W1,
            other => return Err(ExchangeError::UnsupportedInterval(other.to_string())),
        };
        Ok(timeframe)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
