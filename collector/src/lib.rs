//! Collector: resumable historical candle backfill
//!
//! Walks a time window from the last persisted checkpoint up to "now",
//! fetching bounded batches of OHLCV candles, upserting them into the
//! `market_data` table and advancing the checkpoint after every batch.
//!
//! # Components
//!
//! - **Backfill loop** ([`backfill::Backfill`]): rate-limited batch loop with
//!   linear backoff and skip-forward on persistent failures
//! - **Data** ([`data`]): candle store and checkpoint store
//! - **Exchange** ([`exchange`]): the [`exchange::CandleSource`] seam over the
//!   Binance REST client
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use collector::prelude::*;
//! use shared::{BinanceClient, Config, Shutdown};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let db = shared::get_db_connection(&config.database_url).await?;
//! let backfill = Backfill::new(
//!     BackfillConfig::new("BTC/USDT", shared::Timeframe::M1),
//!     Arc::new(BinanceClient::from_config(&config)),
//!     Arc::new(SeaOrmCandleStore::new(db)),
//!     Arc::new(JsonFileCheckpoint::new("progress/collection_progress.json")),
//!     Shutdown::new(),
//! );
//! let summary = backfill.run().await;
//! println!("{} records", summary.records_written);
//! # Ok(())
//! # }
//! ```

pub mod backfill;
pub mod config;
pub mod data;
pub mod error;
pub mod exchange;

pub mod prelude {
    pub use crate::backfill::*;
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::exchange::*;
}

/// Result type alias
pub type Result<T> = std::result::Result<T, error::CollectorError>;
