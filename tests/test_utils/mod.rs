//! Test utilities for database and router testing.
//!
//! Each helper opens a fresh in-memory SQLite database with all migrations
//! applied, so tests never share state.

#![allow(dead_code)]

use anyhow::Result;
use axum::Router;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::json;
use slack_relay::{
    config::AppConfig,
    models::client,
    repositories::ClientRepository,
    server::{AppState, create_app},
};
use std::sync::Arc;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    // A single connection: each in-memory SQLite connection is a separate database.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database and returns it behind an Arc.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Configuration pointing the Slack API at a mock server.
pub fn test_config(slack_api_base: &str) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        slack_api_base: slack_api_base.to_string(),
        oauth_redirect_uri: "https://relay.test/authorization".to_string(),
        ..Default::default()
    }
}

/// Builds the full router on a fresh database.
pub async fn setup_test_app(slack_api_base: &str) -> Result<(Router, AppState)> {
    let db = setup_test_db().await?;
    let state = AppState::new(test_config(slack_api_base), db);
    Ok((create_app(state.clone()), state))
}

/// Registers a Slack application directly through the repository.
pub async fn insert_client(
    db: Arc<DatabaseConnection>,
    slack_client_id: &str,
    slack_client_secret: &str,
) -> Result<client::Model> {
    Ok(ClientRepository::new(db)
        .create(slack_client_id, slack_client_secret, Some("Test App"))
        .await?)
}

/// A successful `oauth.v2.access` body.
pub fn slack_token_body(team_id: &str, team_name: &str, user_id: &str) -> serde_json::Value {
    json!({
        "ok": true,
        "app_id": "A0TESTAPP",
        "team": { "id": team_id, "name": team_name },
        "enterprise": null,
        "is_enterprise_install": false,
        "authed_user": {
            "id": user_id,
            "scope": "channels:history,channels:read",
            "access_token": format!("xoxp-{user_id}"),
            "token_type": "user"
        }
    })
}

/// Pulls the `state` query parameter out of a redirect location.
pub fn state_param(location: &str) -> String {
    url::Url::parse(location)
        .expect("redirect location is a URL")
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("redirect carries a state parameter")
}
