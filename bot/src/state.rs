use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shared::config::env_or;
use shared::{BinanceClient, Config, Timeframe};

use crate::services::predictor::{LinearModel, PricePredictor};

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Candles fetched per tick
    pub candle_limit: u32,
    pub model_path: PathBuf,
    /// Minimum predicted relative move before taking a position
    pub threshold: f64,
    /// Quote amount committed per trade
    pub trade_notional: Decimal,
    pub hold: chrono::Duration,
    pub poll: Duration,
    pub initial_balance: Decimal,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::M1,
            candle_limit: 100,
            model_path: PathBuf::from("models/bot1/model.json"),
            threshold: 0.0001,
            trade_notional: Decimal::from(100),
            hold: chrono::Duration::seconds(60),
            poll: Duration::from_secs(60),
            initial_balance: Decimal::from(10_000),
        }
    }
}

impl BotSettings {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let defaults = Self::default();
        let hold_seconds: i64 = env_or("BOT_HOLD_SECONDS", defaults.hold.num_seconds())?;
        let poll_seconds: u64 = env_or("BOT_POLL_SECONDS", defaults.poll.as_secs())?;

        let settings = Self {
            symbol: env_or("BOT_SYMBOL", defaults.symbol)?,
            timeframe: env_or("BOT_INTERVAL", defaults.timeframe)?,
            candle_limit: env_or("BOT_CANDLE_LIMIT", defaults.candle_limit)?,
            model_path: env_or("BOT_MODEL_PATH", defaults.model_path)?,
            threshold: env_or("BOT_THRESHOLD", defaults.threshold)?,
            trade_notional: env_or("BOT_TRADE_NOTIONAL", defaults.trade_notional)?,
            hold: chrono::Duration::seconds(hold_seconds.max(0)),
            poll: Duration::from_secs(poll_seconds),
            initial_balance: env_or("BOT_INITIAL_BALANCE", defaults.initial_balance)?,
        };

        if settings.trade_notional <= Decimal::ZERO {
            anyhow::bail!("BOT_TRADE_NOTIONAL must be positive");
        }
        if settings.threshold < 0.0 {
            anyhow::bail!("BOT_THRESHOLD must not be negative");
        }
        Ok(settings)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: BotSettings,
    pub client: Arc<BinanceClient>,
    pub predictor: Option<Arc<dyn PricePredictor>>,
}

impl AppState {
    pub fn new() -> Result<Self, anyhow::Error> {
        let config = Config::from_env()?;
        let settings = BotSettings::from_env()?;
        let client = Arc::new(BinanceClient::from_config(&config));

        let predictor: Option<Arc<dyn PricePredictor>> = match LinearModel::load(&settings.model_path) {
            Ok(model) => {
                tracing::info!("Model loaded from {}", settings.model_path.display());
                Some(Arc::new(model))
            }
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        };

        Ok(AppState {
            settings,
            client,
            predictor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_env() {
        std::env::set_var("BOT_SYMBOL", "ETH/USDT");
        std::env::set_var("BOT_INTERVAL", "5m");
        std::env::set_var("BOT_TRADE_NOTIONAL", "250.5");
        std::env::set_var("BOT_HOLD_SECONDS", "120");

        let settings = BotSettings::from_env().unwrap();
        assert_eq!(settings.symbol, "ETH/USDT");
        assert_eq!(settings.timeframe, Timeframe::M5);
        assert_eq!(settings.trade_notional, Decimal::new(2505, 1));
        assert_eq!(settings.hold, chrono::Duration::seconds(120));
        assert_eq!(settings.candle_limit, 100);

        std::env::set_var("BOT_CANDLE_LIMIT", "250");
        assert_eq!(BotSettings::from_env().unwrap().candle_limit, 250);
        std::env::remove_var("BOT_CANDLE_LIMIT");

        std::env::set_var("BOT_TRADE_NOTIONAL", "-1");
        assert!(BotSettings::from_env().is_err());
        std::env::set_var("BOT_TRADE_NOTIONAL", "lots");
        assert!(BotSettings::from_env().is_err());

        for key in ["BOT_SYMBOL", "BOT_INTERVAL", "BOT_TRADE_NOTIONAL", "BOT_HOLD_SECONDS"] {
            std::env::remove_var(key);
        }
    }
}
