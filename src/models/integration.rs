//! Integration entity model
//!
//! This module contains the SeaORM entity for the integration table, which
//! links a tenant account, a client registration and a Slack team to the user
//! token Slack issued for them.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Completed linkage of tenant, client registration, team and credential
#[derive(Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Tenant account that initiated the authorization
    pub account_id: i32,

    /// Client registration used for the exchange
    pub client_id: i32,

    /// Team the user authorized from
    pub team_id: i32,

    /// Slack id of the authorizing user
    pub slack_user_id: String,

    /// User access token issued by Slack
    pub access_token: String,

    /// Slack application id reported by the token endpoint
    pub app_id: String,

    pub created: DateTimeWithTimeZone,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field("team_id", &self.team_id)
            .field("slack_user_id", &self.slack_user_id)
            .field("access_token", &"[REDACTED]")
            .field("app_id", &self.app_id)
            .field("created", &self.created)
            .finish()
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
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id"
    )]
    Team,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
