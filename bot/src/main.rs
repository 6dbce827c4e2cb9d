use anyhow::Result;
use shared::Shutdown;
use tracing_subscriber::EnvFilter;

mod error;
mod services;
mod state;

use crate::services::trader::TradingBot;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        "Starting trading bot v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIME")
    );

    let app_state = AppState::new()?;
    tracing::info!("AppState initialized");

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let mut bot = TradingBot::new(
        app_state.settings.clone(),
        app_state.client.clone(),
        app_state.predictor.clone(),
        shutdown,
    );
    bot.health_check();
    bot.run().await;

    if let Some(open) = bot.positions().open_position() {
        tracing::warn!(
            "Stopped with an open {} position of {} opened at {}",
            open.side,
            open.size,
            open.opened_at
        );
    }
    tracing::info!("Bot stopped with balance {}", bot.exchange().balance());
    Ok(())
}
