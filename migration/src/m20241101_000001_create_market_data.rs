use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per candle open time (UTC); the primary key makes re-inserts upserts.
        // DATETIME stores the UTC value as written, with no 2038 limit.
        manager
            .create_table(
                Table::create()
                    .table(MarketData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketData::Timestamp)
                            .date_time()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MarketData::Open).double().not_null())
                    .col(ColumnDef::new(MarketData::High).double().not_null())
                    .col(ColumnDef::new(MarketData::Low).double().not_null())
                    .col(ColumnDef::new(MarketData::Close).double().not_null())
                    .col(ColumnDef::new(MarketData::Volume).double().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketData::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MarketData {
    Table,
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
}
