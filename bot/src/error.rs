use std::path::PathBuf;

use rust_decimal::Decimal;
use shared::ExchangeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Market data error: {source}")]
    Exchange {
        #[from]
        source: ExchangeError,
    },

    #[error("No market data for {0}")]
    NoMarketData(String),

    #[error("Indicator calculation error: {0}")]
    Indicator(String),

    #[error("Could not load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}
