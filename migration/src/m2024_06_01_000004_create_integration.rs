//! Migration to create the integration table.
//!
//! Integrations are append-only: every completed authorization inserts a new
//! row, so there is deliberately no unique index over the
//! (account, client, team) tuple.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Integration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Integration::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Integration::AccountId).integer().not_null())
                    .col(ColumnDef::new(Integration::ClientId).integer().not_null())
                    .col(ColumnDef::new(Integration::TeamId).integer().not_null())
                    .col(ColumnDef::new(Integration::SlackUserId).text().not_null())
                    .col(ColumnDef::new(Integration::AccessToken).text().not_null())
                    .col(ColumnDef::new(Integration::AppId).text().not_null())
                    .col(
                        ColumnDef::new(Integration::Created)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integration_client_id")
                            .from(Integration::Table, Integration::ClientId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integration_team_id")
                            .from(Integration::Table, Integration::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_integration_account_id")
                    .table(Integration::Table)
                    .col(Integration::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_integration_account_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Integration::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Integration {
    Table,
    Id,
    AccountId,
    ClientId,
    TeamId,
    SlackUserId,
    AccessToken,
    AppId,
    Created,
}

#[derive(DeriveIden)]
enum Client {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Team {
    Table,
    Id,
}
