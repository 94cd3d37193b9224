//! # OAuth State Repository
//!
//! Persistence for pending authorization attempts. A state is redeemable while
//! `redeemed IS NULL`; redemption is a conditional update so that at most one
//! callback can ever consume a given row.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, prelude::Expr,
};
use std::sync::Arc;

use crate::models::client;
use crate::models::oauth_state::{self, ActiveModel, Entity, Model};

/// A non-redeemed state joined with the registration it was issued for
#[derive(Debug, Clone)]
pub struct PendingState {
    pub state: Model,
    pub client: client::Model,
}

/// Repository for OAuth state database operations
pub struct OAuthStateRepository {
    db: Arc<DatabaseConnection>,
}

impl OAuthStateRepository {
    /// Create a new OAuth state repository
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a fresh, unredeemed state for `(account_id, client_id)`
    pub async fn create(&self, account_id: i32, client_id: i32) -> Result<Model, sea_orm::DbErr> {
        ActiveModel {
            account_id: Set(account_id),
            client_id: Set(client_id),
            created: Set(Utc::now().into()),
            redeemed: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
    }

    /// Fetch a state row by id regardless of redemption
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(id).one(&*self.db).await
    }

    /// Find the newest non-redeemed state matching all three ids, joined to its client.
    ///
    /// When `max_age` is set, states created before `now - max_age` are ignored.
    pub async fn find_redeemable(
        &self,
        state_id: i32,
        account_id: i32,
        client_id: i32,
        max_age: Option<Duration>,
    ) -> Result<Option<PendingState>, sea_orm::DbErr> {
        let mut query = Entity::find()
            .inner_join(client::Entity)
            .select_also(client::Entity)
            .filter(oauth_state::Column::Id.eq(state_id))
            .filter(oauth_state::Column::AccountId.eq(account_id))
            .filter(oauth_state::Column::ClientId.eq(client_id))
            .filter(oauth_state::Column::Redeemed.is_null());

        if let Some(max_age) = max_age {
            let cutoff: sea_orm::prelude::DateTimeWithTimeZone = (Utc::now() - max_age).into();
            query = query.filter(oauth_state::Column::Created.gte(cutoff));
        }

        let row = query
            .order_by_desc(oauth_state::Column::Created)
            .order_by_desc(oauth_state::Column::Id)
            .one(&*self.db)
            .await?;

        Ok(row.and_then(|(state, client)| client.map(|client| PendingState { state, client })))
    }

    /// Mark a state redeemed if, and only if, nobody has redeemed it yet.
    ///
    /// Returns `true` when this call performed the redemption. Takes an explicit
    /// connection so it can run inside the caller's transaction.
    pub async fn redeem_with<C>(conn: &C, id: i32) -> Result<bool, sea_orm::DbErr>
    where
        C: ConnectionTrait,
    {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let result = Entity::update_many()
            .col_expr(oauth_state::Column::Redeemed, Expr::value(now))
            .filter(oauth_state::Column::Id.eq(id))
            .filter(oauth_state::Column::Redeemed.is_null())
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
