//! Candle persistence

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, TransactionTrait};
use shared::entity::market_data;
use shared::Candle;

use crate::Result;

/// Rows per INSERT statement.
const UPSERT_CHUNK: usize = 1000;

/// Persistent store collaborator. `upsert_candles` must be idempotent on
/// the candle timestamp.
#[async_trait]
pub trait CandleStore: Send + Sync {
    async fn upsert_candles(&self, candles: &[Candle]) -> Result<()>;
}

/// `market_data` table through Sea-ORM.
#[derive(Debug, Clone)]
pub struct SeaOrmCandleStore {
    db: DatabaseConnection,
}

impl SeaOrmCandleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Number of stored rows
    pub async fn count(&self) -> Result<u64> {
        Ok(market_data::Entity::find().count(&self.db).await?)
    }

    /// All stored candles, oldest first
    pub async fn all(&self) -> Result<Vec<Candle>> {
        let rows = market_data::Entity::find()
            .order_by_asc(market_data::Column::Timestamp)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Candle::from).collect())
    }
}

#[async_trait]
impl CandleStore for SeaOrmCandleStore {
    async fn upsert_candles(&self, candles: &[Candle]) -> Result<()> {
        if candles.is_empty() {
            return Ok(());
        }

        // A batch lands completely or not at all
        let txn = self.db.begin().await?;
        for chunk in candles.chunks(UPSERT_CHUNK) {
            let models = chunk.iter().map(market_data::ActiveModel::from);
            market_data::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(market_data::Column::Timestamp)
                        .update_columns([
                            market_data::Column::Open,
                            market_data::Column::High,
                            market_data::Column::Low,
                            market_data::Column::Close,
                            market_data::Column::Volume,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

/// In-memory store keyed by timestamp
#[derive(Debug, Default)]
pub struct MemoryCandleStore {
    candles: Mutex<BTreeMap<DateTime<Utc>, Candle>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of stored candles
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stored candles, oldest first
    pub fn candles(&self) -> Vec<Candle> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<DateTime<Utc>, Candle>> {
        self.candles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn upsert_candles(&self, candles: &[Candle]) -> Result<()> {
        let mut stored = self.lock();
        for candle in candles {
            stored.insert(candle.timestamp, candle.clone());
        }
        Ok(())
    }
}
