use std::sync::Arc;

use anyhow::Result;
use collector::prelude::*;
use shared::{get_db_connection, setup_database, BinanceClient, Config, Shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let settings = CollectorSettings::from_env()?;

    let db = get_db_connection(&config.database_url).await?;
    setup_database(&db).await?;

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let store = Arc::new(SeaOrmCandleStore::new(db));
    let checkpoints = Arc::new(JsonFileCheckpoint::new(&settings.progress_file));
    tracing::info!(
        "Collecting {} {} candles, progress file {}",
        settings.backfill.symbol,
        settings.backfill.timeframe,
        checkpoints.path().display()
    );

    let backfill = Backfill::new(
        settings.backfill,
        Arc::new(BinanceClient::from_config(&config)),
        store.clone(),
        checkpoints,
        shutdown,
    );
    let summary = backfill.run().await;

    if summary.interrupted {
        tracing::info!("Data collection interrupted. Progress saved.");
    }
    tracing::info!(
        "Data collection completed. Total records saved: {} ({} batches, {} skipped windows, {} failures)",
        summary.records_written,
        summary.batches,
        summary.skipped_windows,
        summary.failures
    );
    tracing::info!("market_data holds {} rows", store.count().await?);

    Ok(())
}
