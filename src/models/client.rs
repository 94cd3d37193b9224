//! Client registration entity model
//!
//! One row per Slack application registration. Rows are created by
//! administration (see the `register-client` binary) and only read by the
//! OAuth flow.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// Slack application registration usable by one or more tenant accounts
#[derive(Clone, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "client")]
pub struct Model {
    /// Store-assigned identifier referenced by `oauth_state.client_id`
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Public Slack client id sent on the authorize redirect
    pub client_id: String,

    /// Confidential Slack client secret, only sent to the token endpoint
    pub client_secret: String,

    /// Optional human-readable label
    pub name: Option<String>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::oauth_state::Entity")]
    OAuthState,
    #[sea_orm(has_many = "super::integration::Entity")]
    Integration,
}

impl Related<super::oauth_state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OAuthState.def()
    }
}

impl Related<super::integration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Integration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
