//! Candle source abstraction and its Binance implementation

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{BinanceClient, Candle, Timeframe};

use crate::Result;

/// Market data collaborator of the backfill loop.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Up to `limit` candles with open time `>= start_time`, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_time: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Candle>>;

    /// Pause the loop takes after every successful request.
    fn min_request_interval(&self) -> Duration;
}

#[async_trait]
impl CandleSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_time: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let candles = self
            .fetch_ohlcv(symbol, timeframe, Some(start_time), limit)
            .await?;
        Ok(candles)
    }

    fn min_request_interval(&self) -> Duration {
        self.rate_limit()
    }
}
