//! Slack OAuth client
//!
//! Builds the `oauth/v2/authorize` redirect and exchanges authorization codes at
//! `oauth.v2.access`. Only user scopes are requested; the integration stores the
//! authed user's token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;

/// User scopes requested on every authorization link.
pub const USER_SCOPES: [&str; 10] = [
    "channels:history",
    "channels:read",
    "groups:history",
    "groups:read",
    "im:history",
    "im:read",
    "mpim:history",
    "mpim:read",
    "team:read",
    "users:read",
];

/// Slack client errors
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Slack rejected the code exchange: {0}")]
    Rejected(String),

    #[error("could not parse the token response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Where to send users and codes
#[derive(Debug, Clone)]
pub struct SlackOAuthConfig {
    /// Base for the user-facing authorize page (`https://slack.com`)
    pub oauth_base: String,
    /// Base for Web API methods (`https://slack.com/api`)
    pub api_base: String,
    /// Callback URI registered with the Slack app
    pub redirect_uri: String,
}

impl From<&AppConfig> for SlackOAuthConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            oauth_base: config.slack_oauth_base.clone(),
            api_base: config.slack_api_base.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
        }
    }
}

impl SlackOAuthConfig {
    /// Build the authorize URL for a registration's public client id and an encoded state.
    pub fn authorize_url(&self, slack_client_id: &str, state: &str) -> Result<Url, SlackError> {
        let mut url = Url::parse(&format!(
            "{}/oauth/v2/authorize",
            self.oauth_base.trim_end_matches('/')
        ))?;
        url.query_pairs_mut()
            .append_pair("client_id", slack_client_id)
            .append_pair("scope", "")
            .append_pair("user_scope", &USER_SCOPES.join(","))
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state);

        Ok(url)
    }
}

/// Workspace identity reported by Slack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackTeam {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Enterprise Grid organization, present only for org installs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackEnterprise {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The user who approved the installation, with their user token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthedUser {
    pub id: String,
    #[serde(default)]
    pub scope: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for AuthedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthedUser")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Successful `oauth.v2.access` payload
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackTokenResponse {
    #[serde(default)]
    pub ok: bool,
    /// Bot token; absent when only user scopes were granted
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub bot_user_id: Option<String>,
    pub app_id: String,
    pub team: SlackTeam,
    #[serde(default)]
    pub enterprise: Option<SlackEnterprise>,
    pub authed_user: AuthedUser,
}

impl std::fmt::Debug for SlackTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackTokenResponse")
            .field("ok", &self.ok)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("bot_user_id", &self.bot_user_id)
            .field("app_id", &self.app_id)
            .field("team", &self.team)
            .field("enterprise", &self.enterprise)
            .field("authed_user", &self.authed_user)
            .finish()
    }
}

/// Slack's failure envelope (`{"ok": false, "error": "invalid_code"}`)
#[derive(Debug, Deserialize)]
struct SlackEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Parse an `oauth.v2.access` body, rejecting `ok: false` replies.
pub fn parse_token_response(body: &[u8]) -> Result<SlackTokenResponse, SlackError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let envelope = SlackEnvelope::deserialize(&value)?;

    if !envelope.ok {
        return Err(SlackError::Rejected(
            envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

/// Seam for the outbound code-for-token call.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange `code` using a registration's public id and secret.
    async fn exchange_code(
        &self,
        slack_client_id: &str,
        slack_client_secret: &str,
        code: &str,
    ) -> Result<SlackTokenResponse, SlackError>;
}

/// reqwest-backed [`TokenExchanger`] calling the Slack Web API
#[derive(Debug, Clone)]
pub struct SlackClient {
    api_base: String,
    http: reqwest::Client,
}

impl SlackClient {
    pub fn new(config: &SlackOAuthConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TokenExchanger for SlackClient {
    async fn exchange_code(
        &self,
        slack_client_id: &str,
        slack_client_secret: &str,
        code: &str,
    ) -> Result<SlackTokenResponse, SlackError> {
        let response = self
            .http
            .get(format!("{}/oauth.v2.access", self.api_base))
            .query(&[
                ("client_id", slack_client_id),
                ("client_secret", slack_client_secret),
                ("code", code),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).chars().take(200).collect();
            warn!(status = status.as_u16(), "Slack token endpoint returned an error status");
            return Err(SlackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let token = parse_token_response(&body)?;
        debug!(team_id = %token.team.id, app_id = %token.app_id, "Exchanged Slack authorization code");
        Ok(token)
    }
}
