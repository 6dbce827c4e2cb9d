//! Binance USDⓈ-M futures REST client (public market data only)

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::ExchangeError;
use crate::models::{Candle, Timeframe};

/// Binance caps `/fapi/v1/klines` at 1500 rows per request.
pub const MAX_KLINES_PER_REQUEST: u32 = 1500;

#[derive(Debug, Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Duration,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, rate_limit: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            rate_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.exchange_base_url.clone(),
            Duration::from_millis(config.exchange_rate_limit_ms),
        )
    }

    /// Minimum spacing between two requests.
    pub fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    /// Fetch up to `limit` candles, oldest first.
    ///
    /// With `since` the window starts at that open time, otherwise the most
    /// recent candles are returned.
    pub async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!("{}/fapi/v1/klines", self.base_url);
        let mut query = vec![
            ("symbol", market_symbol(symbol)),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit.clamp(1, MAX_KLINES_PER_REQUEST).to_string()),
        ];
        if let Some(since) = since {
            query.push(("startTime", since.timestamp_millis().to_string()));
        }

        debug!("GET {} {:?}", url, query);
        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        let mut candles = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

/// "BTC/USDT" -> "BTCUSDT"; settlement suffixes like ":USDT" are dropped.
pub fn market_symbol(symbol: &str) -> String {
    let symbol = symbol.split(':').next().unwrap_or(symbol);
    symbol.replace(['/', '-'], "").to_uppercase()
}

/// Kline row: `[openTime, open, high, low, close, volume, closeTime, ...]`.
fn parse_kline(row: &[Value]) -> Result<Candle, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Decode(format!(
            "kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| ExchangeError::Decode(format!("invalid open time: {}", row[0])))?;
    let timestamp = DateTime::from_timestamp_millis(open_time)
        .ok_or_else(|| ExchangeError::Decode(format!("open time out of range: {}", open_time)))?;

    Ok(Candle::new(
        timestamp,
        number(&row[1])?,
        number(&row[2])?,
        number(&row[3])?,
        number(&row[4])?,
        number(&row[5])?,
    ))
}

// Binance sends prices as strings; accept plain numbers too.
fn number(value: &Value) -> Result<f64, ExchangeError> {
    match value {
        Value::String(s) => s
            .parse()
            .map_err(|_| ExchangeError::Decode(format!("invalid number: {:?}", s))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExchangeError::Decode(format!("invalid number: {}", n))),
        other => Err(ExchangeError::Decode(format!("invalid number: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_symbol() {
        assert_eq!(market_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(market_symbol("btc/usdt:USDT"), "BTCUSDT");
        assert_eq!(market_symbol("ETHUSDT"), "ETHUSDT");
    }

    #[test]
    fn test_parse_kline() {
        let row = json!([
            1577836800000i64,
            "7189.43",
            "7190.52",
            "7170.15",
            "7171.55",
            "2449.049",
            1577836859999i64,
            "17576890.12",
            1120,
            "1189.341",
            "8535830.69",
            "0"
        ]);
        let candle = parse_kline(row.as_array().unwrap()).unwrap();
        assert_eq!(candle.timestamp.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(candle.open, 7189.43);
        assert_eq!(candle.close, 7171.55);
        assert_eq!(candle.volume, 2449.049);
    }

    #[test]
    fn test_parse_kline_rejects_garbage() {
        let short = json!([1577836800000i64, "1.0"]);
        assert!(matches!(
            parse_kline(short.as_array().unwrap()),
            Err(ExchangeError::Decode(_))
        ));

        let bad_price = json!([1577836800000i64, "abc", "1", "1", "1", "1"]);
        assert!(matches!(
            parse_kline(bad_price.as_array().unwrap()),
            Err(ExchangeError::Decode(_))
        ));
    }
}
