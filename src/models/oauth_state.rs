//! # OAuth State Model
//!
//! One row per authorization attempt. The row id travels inside the state
//! token; the callback only succeeds against a row whose `redeemed` is NULL.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

/// Pending or completed authorization attempt for an (account, client) pair
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_state")]
pub struct Model {
    /// Store-assigned identifier, embedded in the state token
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Tenant account that requested the redirect link
    pub account_id: i32,

    /// Client registration the redirect was issued for
    pub client_id: i32,

    /// When the redirect link was issued
    pub created: DateTimeWithTimeZone,

    /// When a callback consumed this state; NULL while still redeemable
    pub redeemed: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether a callback has already consumed this state
    pub fn is_redeemed(&self) -> bool {
        self.redeemed.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
