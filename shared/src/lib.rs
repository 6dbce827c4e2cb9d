pub mod backoff;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod exchange;
pub mod models;
pub mod shutdown;

pub use backoff::Backoff;
pub use config::Config;
pub use database::{get_db_connection, setup_database};
pub use error::ExchangeError;
pub use exchange::BinanceClient;
pub use models::*;
pub use shutdown::Shutdown;
