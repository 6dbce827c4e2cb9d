//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::models::Candle;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "market_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,
    #[sea_orm(column_type = "Double")]
    pub open: f64,
    #[sea_orm(column_type = "Double")]
    pub high: f64,
    #[sea_orm(column_type = "Double")]
    pub low: f64,
    #[sea_orm(column_type = "Double")]
    pub close: f64,
    #[sea_orm(column_type = "Double")]
    pub volume: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Candle> for ActiveModel {
    fn from(candle: &Candle) -> Self {
        ActiveModel {
            timestamp: Set(candle.timestamp),
            open: Set(candle.open),
            high: Set(candle.high),
            low: Set(candle.low),
            close: Set(candle.close),
            volume: Set(candle.volume),
        }
    }
}

impl From<Model> for Candle {
    fn from(model: Model) -> Self {
        Candle::new(
            model.timestamp,
            model.open,
            model.high,
            model.low,
            model.close,
            model.volume,
        )
    }
}
