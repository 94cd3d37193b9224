//! # Client Repository
//!
//! Read access to Slack application registrations, plus the inserts used by the
//! `register-client` admin binary.

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::Arc;

use crate::models::client::{self, ActiveModel, Entity, Model};

/// Repository for client registration operations
pub struct ClientRepository {
    db: Arc<DatabaseConnection>,
}

impl ClientRepository {
    /// Create a new client repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Look up a registration by its store id
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(id).one(&*self.db).await
    }

    /// Register a Slack application
    pub async fn create(
        &self,
        slack_client_id: &str,
        slack_client_secret: &str,
        name: Option<&str>,
    ) -> Result<Model, sea_orm::DbErr> {
        ActiveModel {
            client_id: Set(slack_client_id.to_string()),
            client_secret: Set(slack_client_secret.to_string()),
            name: Set(name.map(str::to_string)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
    }

    /// All registrations, oldest first
    pub async fn list(&self) -> Result<Vec<Model>, sea_orm::DbErr> {
        Entity::find()
            .order_by_asc(client::Column::Id)
            .all(&*self.db)
            .await
    }
}
