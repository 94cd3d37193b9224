//! # Raw Event Repository

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use std::sync::Arc;

use crate::models::raw_event::{ActiveModel, Entity, Model};

/// Archive of inbound event bodies, stored byte-for-byte
pub struct RawEventRepository {
    db: Arc<DatabaseConnection>,
}

impl RawEventRepository {
    /// Create a new raw event repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a request body verbatim
    pub async fn insert(&self, body: &[u8]) -> Result<Model, sea_orm::DbErr> {
        ActiveModel {
            event: Set(body.to_vec()),
            created: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
    }

    /// Number of archived events
    pub async fn count(&self) -> Result<u64, sea_orm::DbErr> {
        Entity::find().count(&*self.db).await
    }
}
