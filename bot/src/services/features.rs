//! Model features computed from a candle window

use chrono::{DateTime, Utc};
use shared::Candle;
use ta::indicators::{SimpleMovingAverage, StandardDeviation};
use ta::Next;

use crate::error::BotError;

pub const SHORT_WINDOW: usize = 20;
pub const LONG_WINDOW: usize = 50;
pub const VOLATILITY_WINDOW: usize = 20;

/// Features of one candle. A value is `None` until its window is full.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Mean close over the last 20 candles
    pub ma20: Option<f64>,
    /// Mean close over the last 50 candles
    pub ma50: Option<f64>,
    /// Close-to-close change as a fraction
    pub returns: Option<f64>,
    /// Sample standard deviation (n - 1 denominator) of close over the last 20 candles
    pub volatility: Option<f64>,
}

impl FeatureRow {
    pub fn is_complete(&self) -> bool {
        self.ma20.is_some() && self.ma50.is_some() && self.returns.is_some() && self.volatility.is_some()
    }
}

/// One row per candle, in input order.
pub fn calculate_features(candles: &[Candle]) -> Result<Vec<FeatureRow>, BotError> {
    let indicator_err = |e: ta::errors::TaError| BotError::Indicator(format!("{:?}", e));
    let mut ma20 = SimpleMovingAverage::new(SHORT_WINDOW).map_err(indicator_err)?;
    let mut ma50 = SimpleMovingAverage::new(LONG_WINDOW).map_err(indicator_err)?;
    let mut volatility = StandardDeviation::new(VOLATILITY_WINDOW).map_err(indicator_err)?;

    // ta::StandardDeviation divides by n
    let sample_correction = (VOLATILITY_WINDOW as f64 / (VOLATILITY_WINDOW - 1) as f64).sqrt();

    let mut rows = Vec::with_capacity(candles.len());
    let mut previous_close: Option<f64> = None;

    for (i, candle) in candles.iter().enumerate() {
        let seen = i + 1;
        let ma20_value = ma20.next(candle.close);
        let ma50_value = ma50.next(candle.close);
        let volatility_value = volatility.next(candle.close) * sample_correction;

        let returns = previous_close
            .filter(|prev| *prev != 0.0)
            .map(|prev| (candle.close - prev) / prev);
        previous_close = Some(candle.close);

        rows.push(FeatureRow {
            timestamp: candle.timestamp,
            close: candle.close,
            ma20: (seen >= SHORT_WINDOW).then_some(ma20_value),
            ma50: (seen >= LONG_WINDOW).then_some(ma50_value),
            returns,
            volatility: (seen >= VOLATILITY_WINDOW).then_some(volatility_value),
        });
    }

    Ok(rows)
}
