//! # Integration Repository
//!
//! Integrations are append-only: every completed exchange inserts a new row,
//! even for an (account, client, team) tuple that already has one.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;

use crate::models::integration::{self, ActiveModel, Entity, Model};

/// Values for a new integration row
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub account_id: i32,
    pub client_id: i32,
    pub team_id: i32,
    pub slack_user_id: String,
    pub access_token: String,
    pub app_id: String,
}

/// Repository for integration records
pub struct IntegrationRepository {
    db: Arc<DatabaseConnection>,
}

impl IntegrationRepository {
    /// Create a new integration repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new integration on the given connection (or transaction)
    pub async fn create_with<C>(conn: &C, new: NewIntegration) -> Result<Model, sea_orm::DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            account_id: Set(new.account_id),
            client_id: Set(new.client_id),
            team_id: Set(new.team_id),
            slack_user_id: Set(new.slack_user_id),
            access_token: Set(new.access_token),
            app_id: Set(new.app_id),
            created: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(conn)
        .await
    }

    /// All integrations for an account, oldest first
    pub async fn list_by_account(&self, account_id: i32) -> Result<Vec<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(integration::Column::AccountId.eq(account_id))
            .order_by_asc(integration::Column::Id)
            .all(&*self.db)
            .await
    }
}
