//! Migration to create the raw_event archive table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RawEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RawEvent::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RawEvent::Event).binary().not_null())
                    .col(
                        ColumnDef::new(RawEvent::Created)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RawEvent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RawEvent {
    Table,
    Id,
    Event,
    Created,
}
