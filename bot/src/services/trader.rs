//! Polling trading loop: market data, prediction, paper orders

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Backoff, BinanceClient, Candle, Shutdown, Timeframe};
use tracing::{error, info, warn};

use crate::error::BotError;
use crate::services::features::calculate_features;
use crate::services::position_service::PositionManager;
use crate::services::predictor::PricePredictor;
use crate::services::simulated_exchange::{Order, SimulatedExchange};
use crate::services::trading_signal::{get_position, PositionSignal};
use crate::state::BotSettings;

/// Most recent candles for a market.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn latest_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, BotError>;
}

#[async_trait]
impl MarketFeed for BinanceClient {
    async fn latest_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, BotError> {
        Ok(self.fetch_ohlcv(symbol, timeframe, None, limit).await?)
    }
}

/// What a single tick observed and did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub price: f64,
    pub predicted: Option<f64>,
    pub signal: PositionSignal,
    pub opened: Option<Order>,
    pub closed: Option<Order>,
}

pub struct TradingBot {
    settings: BotSettings,
    feed: Arc<dyn MarketFeed>,
    predictor: Option<Arc<dyn PricePredictor>>,
    exchange: SimulatedExchange,
    positions: PositionManager,
    backoff: Backoff,
    shutdown: Shutdown,
}

impl TradingBot {
    pub fn new(
        settings: BotSettings,
        feed: Arc<dyn MarketFeed>,
        predictor: Option<Arc<dyn PricePredictor>>,
        shutdown: Shutdown,
    ) -> Self {
        let exchange = SimulatedExchange::new(settings.initial_balance);
        let positions = PositionManager::new(
            settings.symbol.clone(),
            settings.trade_notional,
            settings.hold,
        );
        Self {
            settings,
            feed,
            predictor,
            exchange,
            positions,
            backoff: Backoff::default(),
            shutdown,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn exchange(&self) -> &SimulatedExchange {
        &self.exchange
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    /// Logs the bot's readiness. Returns whether a model is loaded.
    pub fn health_check(&self) -> bool {
        let model_loaded = self.predictor.is_some();
        info!(
            "Health check: symbol={} interval={} model_loaded={} balance={}",
            self.settings.symbol,
            self.settings.timeframe,
            model_loaded,
            self.exchange.balance()
        );
        if !model_loaded {
            warn!("No model loaded, signals stay flat and no trades are placed");
        }
        model_loaded
    }

    /// Fetch, predict, decide, then open or close positions.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, BotError> {
        let symbol = self.settings.symbol.clone();
        let candles = self
            .feed
            .latest_candles(&symbol, self.settings.timeframe, self.settings.candle_limit)
            .await?;
        let latest = candles
            .last()
            .ok_or_else(|| BotError::NoMarketData(symbol.clone()))?;
        let price = latest.close;
        self.exchange.set_price(&symbol, price)?;

        let features = calculate_features(&candles)?;
        let predicted = match (&self.predictor, features.last()) {
            (Some(predictor), Some(row)) if row.is_complete() => predictor.predict(row),
            (Some(_), _) => {
                warn!("Not enough candles for a full feature row, skipping prediction");
                None
            }
            (None, _) => None,
        };
        let signal = predicted
            .map(|p| get_position(price, p, self.settings.threshold))
            .unwrap_or(PositionSignal::Flat);
        info!(
            "{} price={} predicted={:?} signal={} ({})",
            symbol,
            price,
            predicted,
            signal,
            signal.as_i8()
        );

        let opened = self
            .positions
            .manage_position(&mut self.exchange, signal, price, now)?;
        let closed = self
            .positions
            .check_and_close_position(&mut self.exchange, now)?;

        Ok(TickReport {
            price,
            predicted,
            signal,
            opened,
            closed,
        })
    }

    /// Tick every poll interval until shutdown. Failed ticks back off
    /// linearly; a successful tick resets the failure count.
    pub async fn run(&mut self) {
        let mut failures: u32 = 0;
        info!(
            "Trading {} on {} every {:?}",
            self.settings.symbol, self.settings.timeframe, self.settings.poll
        );

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let wait = match self.tick(Utc::now()).await {
                Ok(report) => {
                    failures = 0;
                    for order in report.opened.iter().chain(report.closed.iter()) {
                        info!(
                            "{} {} {} @ {} (notional {}) at {}",
                            order.side,
                            order.amount,
                            order.symbol,
                            order.price,
                            order.notional(),
                            order.timestamp
                        );
                    }
                    self.settings.poll
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.backoff.delay(failures);
                    error!(
                        "Tick failed ({} in a row): {}. Retrying in {}s",
                        failures,
                        e,
                        delay.as_secs()
                    );
                    delay
                }
            };

            if !self.shutdown.sleep(wait).await {
                break;
            }
        }

        info!(
            "Trading stopped: balance={} position={} trades={}",
            self.exchange.balance(),
            self.exchange.position(&self.settings.symbol),
            self.exchange.trade_history().len()
        );
    }
}

impl std::fmt::Debug for TradingBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingBot")
            .field("symbol", &self.settings.symbol)
            .field("model_loaded", &self.predictor.is_some())
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::features::FeatureRow;
    use crate::services::simulated_exchange::OrderSide;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a flat series at `price`, failing the calls listed in `fail_on`.
    struct FakeFeed {
        price: f64,
        fail_on: Vec<usize>,
        calls: AtomicUsize,
        stop_after: Option<(usize, Shutdown)>,
    }

    impl FakeFeed {
        fn new(price: f64) -> Self {
            Self {
                price,
                fail_on: Vec::new(),
                calls: AtomicUsize::new(0),
                stop_after: None,
            }
        }
    }

    #[async_trait]
    impl MarketFeed for FakeFeed {
        async fn latest_candles(
            &self,
            _symbol: &str,
            timeframe: Timeframe,
            limit: u32,
        ) -> Result<Vec<Candle>, BotError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, shutdown)) = &self.stop_after {
                if call >= *after {
                    shutdown.trigger();
                }
            }
            if self.fail_on.contains(&call) {
                return Err(BotError::NoMarketData("fake outage".to_string()));
            }
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            Ok((0..limit as i32)
                .map(|i| {
                    let p = self.price;
                    Candle::new(start + timeframe.span(i), p, p, p, p, 1.0)
                })
                .collect())
        }
    }

    /// Always predicts a fixed price.
    struct FixedPrediction(f64);

    impl PricePredictor for FixedPrediction {
        fn predict(&self, _features: &FeatureRow) -> Option<f64> {
            Some(self.0)
        }
    }

    fn settings() -> BotSettings {
        BotSettings {
            poll: Duration::ZERO,
            ..BotSettings::default()
        }
    }

    fn bot(feed: FakeFeed, predicted: Option<f64>, shutdown: Shutdown) -> TradingBot {
        let predictor = predicted.map(|p| Arc::new(FixedPrediction(p)) as Arc<dyn PricePredictor>);
        TradingBot::new(settings(), Arc::new(feed), predictor, shutdown)
            .with_backoff(Backoff::new(Duration::ZERO, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_tick_opens_long_then_closes_after_hold() {
        let mut bot = bot(FakeFeed::new(100.0), Some(101.0), Shutdown::new());
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let report = bot.tick(now).await.unwrap();
        assert_eq!(report.signal, PositionSignal::Long);
        let opened = report.opened.unwrap();
        assert_eq!(opened.side, OrderSide::Buy);
        assert_eq!(opened.amount, Decimal::ONE);
        assert!(report.closed.is_none());

        let report = bot.tick(now + chrono::Duration::seconds(60)).await.unwrap();
        assert!(report.opened.is_none());
        assert_eq!(report.closed.unwrap().side, OrderSide::Sell);
        assert_eq!(bot.exchange().position("BTC/USDT"), Decimal::ZERO);
        assert_eq!(bot.exchange().trade_history().len(), 2);
    }

    #[tokio::test]
    async fn test_tick_without_model_is_flat() {
        let mut bot = bot(FakeFeed::new(100.0), None, Shutdown::new());
        assert!(!bot.health_check());

        let report = bot.tick(Utc::now()).await.unwrap();
        assert_eq!(report.predicted, None);
        assert_eq!(report.signal, PositionSignal::Flat);
        assert!(bot.exchange().trade_history().is_empty());
    }

    #[tokio::test]
    async fn test_small_prediction_change_is_flat() {
        let mut bot = bot(FakeFeed::new(100.0), Some(100.005), Shutdown::new());
        assert!(bot.health_check());
        let report = bot.tick(Utc::now()).await.unwrap();
        assert_eq!(report.signal, PositionSignal::Flat);
        assert!(report.opened.is_none());
    }

    #[tokio::test]
    async fn test_run_survives_failures_and_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let mut feed = FakeFeed::new(100.0);
        feed.fail_on = vec![1, 2];
        feed.stop_after = Some((4, shutdown.clone()));
        let mut bot = bot(feed, Some(99.0), shutdown);

        bot.run().await;

        // Third call succeeded and opened a short
        assert_eq!(bot.exchange().position("BTC/USDT"), Decimal::NEGATIVE_ONE);
        assert_eq!(bot.positions().open_position().unwrap().side, OrderSide::Sell);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_already_stopped() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut bot = bot(FakeFeed::new(100.0), Some(200.0), shutdown);
        bot.run().await;
        assert!(bot.exchange().trade_history().is_empty());
    }
}
