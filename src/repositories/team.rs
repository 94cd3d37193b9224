//! # Team Repository

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::OnConflict,
};
use std::sync::Arc;

use crate::models::team::{self, ActiveModel, Entity, Model};

/// Repository for Slack workspace records
pub struct TeamRepository {
    db: Arc<DatabaseConnection>,
}

impl TeamRepository {
    /// Create a new team repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert the team, or refresh its name when `slack_team_id` is already known.
    ///
    /// The row is re-read by its natural key afterwards since SQLite does not
    /// report the id of a row touched by `ON CONFLICT DO UPDATE`.
    pub async fn upsert_with<C>(
        conn: &C,
        slack_team_id: &str,
        name: &str,
    ) -> Result<Model, sea_orm::DbErr>
    where
        C: ConnectionTrait,
    {
        let team = ActiveModel {
            slack_team_id: Set(slack_team_id.to_string()),
            name: Set(name.to_string()),
            created: Set(Utc::now().into()),
            ..Default::default()
        };

        Entity::insert(team)
            .on_conflict(
                OnConflict::column(team::Column::SlackTeamId)
                    .update_column(team::Column::Name)
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Entity::find()
            .filter(team::Column::SlackTeamId.eq(slack_team_id))
            .one(conn)
            .await?
            .ok_or_else(|| {
                sea_orm::DbErr::RecordNotFound(format!("team {slack_team_id} after upsert"))
            })
    }

    /// Look up a team by its Slack workspace id
    pub async fn find_by_slack_team_id(
        &self,
        slack_team_id: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(team::Column::SlackTeamId.eq(slack_team_id))
            .one(&*self.db)
            .await
    }
}
