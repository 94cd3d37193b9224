//! Migration to create the oauth_state table.
//!
//! Rows are never deleted: `redeemed` stays NULL until a callback consumes the
//! state, which keeps an audit trail of every authorization attempt.
//!
//! `client_id` carries no foreign key. A link requested for an unknown client
//! still records its state row; the callback join against `client` is what
//! keeps such rows unredeemable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuthState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthState::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuthState::AccountId).integer().not_null())
                    .col(ColumnDef::new(OAuthState::ClientId).integer().not_null())
                    .col(
                        ColumnDef::new(OAuthState::Created)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OAuthState::Redeemed)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_state_account_client")
                    .table(OAuthState::Table)
                    .col(OAuthState::AccountId)
                    .col(OAuthState::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_state_account_client")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(OAuthState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OAuthState {
    #[sea_orm(iden = "oauth_state")]
    Table,
    Id,
    AccountId,
    ClientId,
    Created,
    Redeemed,
}
