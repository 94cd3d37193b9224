//! # OAuth Exchange Coordinator
//!
//! Drives the two halves of the Slack install flow:
//!
//! 1. [`OAuthExchange::build_authorization_link`] records a pending `oauth_state`
//!    row and returns the Slack authorize URL carrying the encoded state token.
//! 2. [`OAuthExchange::complete_authorization`] decodes the token on callback,
//!    matches it against an unredeemed row, exchanges the code with Slack, and
//!    persists the team, the integration and the redemption in one transaction.
//!
//! The two requests share nothing in memory; the `oauth_state` row is the only
//! link between them.

use chrono::TimeDelta;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::models::{integration, team};
use crate::repositories::{
    ClientRepository, IntegrationRepository, NewIntegration, OAuthStateRepository, PendingState,
    TeamRepository,
};
use crate::slack::{SlackClient, SlackError, SlackOAuthConfig, SlackTokenResponse, TokenExchanger};
use crate::state_token::{StateToken, StateTokenError};

/// Failures of the OAuth flow.
///
/// Only [`ExchangeError::InvalidRequest`] is a caller error; everything else
/// surfaces as a 500 with the `Display` text as message.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{0}")]
    InvalidRequest(String),

    /// Codec failure. The message never carries the codec detail.
    #[error("Could not decode the state.")]
    InvalidState(#[source] StateTokenError),

    #[error("Could not retrieve client info for client_id={client_id}")]
    UnknownClient { account_id: i32, client_id: i32 },

    #[error("Could not find the OAuth state for account_id={account_id}, client_id={client_id}")]
    StateNotFound { account_id: i32, client_id: i32 },

    #[error("Could not exchange the token: {0}")]
    ProviderExchange(#[source] SlackError),

    #[error("Could not parse the token response from Slack")]
    InvalidProviderResponse(#[source] serde_json::Error),

    #[error("Could not build the authorization URL: {0}")]
    InvalidConfiguration(String),

    #[error("{context}")]
    Persistence {
        context: String,
        #[source]
        source: DbErr,
    },
}

impl ExchangeError {
    fn persistence(context: impl Into<String>) -> impl FnOnce(DbErr) -> Self {
        let context = context.into();
        move |source| ExchangeError::Persistence { context, source }
    }

    /// Label used on the `oauth_exchanges_total` counter
    pub fn outcome(&self) -> &'static str {
        match self {
            ExchangeError::InvalidRequest(_) => "invalid_request",
            ExchangeError::InvalidState(_) => "invalid_state",
            ExchangeError::UnknownClient { .. } => "unknown_client",
            ExchangeError::StateNotFound { .. } => "state_not_found",
            ExchangeError::ProviderExchange(_) => "provider_error",
            ExchangeError::InvalidProviderResponse(_) => "invalid_provider_response",
            ExchangeError::InvalidConfiguration(_) => "invalid_configuration",
            ExchangeError::Persistence { .. } => "persistence_error",
        }
    }
}

impl From<SlackError> for ExchangeError {
    fn from(error: SlackError) -> Self {
        match error {
            SlackError::InvalidResponse(source) => ExchangeError::InvalidProviderResponse(source),
            other => ExchangeError::ProviderExchange(other),
        }
    }
}

/// Result of a completed callback
#[derive(Debug, Clone)]
pub struct CompletedAuthorization {
    pub token: SlackTokenResponse,
    pub team: team::Model,
    pub integration: integration::Model,
    /// False when the redemption write failed and was only logged
    pub state_redeemed: bool,
}

/// Coordinates link issuance and callback completion
pub struct OAuthExchange {
    db: Arc<DatabaseConnection>,
    states: OAuthStateRepository,
    clients: ClientRepository,
    slack: SlackOAuthConfig,
    exchanger: Arc<dyn TokenExchanger>,
    state_max_age: Option<TimeDelta>,
}

impl OAuthExchange {
    pub fn new(
        db: Arc<DatabaseConnection>,
        slack: SlackOAuthConfig,
        exchanger: Arc<dyn TokenExchanger>,
        state_max_age: Option<TimeDelta>,
    ) -> Self {
        Self {
            states: OAuthStateRepository::new(db.clone()),
            clients: ClientRepository::new(db.clone()),
            db,
            slack,
            exchanger,
            state_max_age,
        }
    }

    /// Wire the coordinator to the real Slack API using application config.
    pub fn from_config(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        let slack = SlackOAuthConfig::from(config);
        let exchanger = Arc::new(SlackClient::new(&slack));
        let state_max_age = config
            .oauth_state_max_age_seconds
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(TimeDelta::try_seconds);
        Self::new(db, slack, exchanger, state_max_age)
    }

    /// Record a pending state for `(account_id, client_id)` and return the Slack
    /// authorize URL to redirect the user to.
    ///
    /// Ids are validated before anything is written. If the client registration
    /// does not exist the freshly written state row is left behind; it can never
    /// be redeemed because the callback lookup joins on `client`.
    pub async fn build_authorization_link(
        &self,
        account_id: i32,
        client_id: i32,
    ) -> Result<Url, ExchangeError> {
        let result = self.issue_link(account_id, client_id).await;
        match &result {
            Ok(_) => metrics::counter!("oauth_links_issued_total").increment(1),
            Err(e) => warn!(account_id, client_id, error = %e, "Could not issue Slack link"),
        }
        result
    }

    async fn issue_link(&self, account_id: i32, client_id: i32) -> Result<Url, ExchangeError> {
        validate_id("account_id", account_id)?;
        validate_id("client_id", client_id)?;

        let state = self.states.create(account_id, client_id).await.map_err(
            ExchangeError::persistence(format!(
                "Could not save the OAuth state for account_id={account_id}, client_id={client_id}"
            )),
        )?;

        let token = StateToken::new(state.id, account_id, client_id).encode();

        let client = self
            .clients
            .find_by_id(client_id)
            .await
            .map_err(ExchangeError::persistence(format!(
                "Could not retrieve client info for client_id={client_id}"
            )))?
            .ok_or(ExchangeError::UnknownClient {
                account_id,
                client_id,
            })?;

        let url = self
            .slack
            .authorize_url(&client.client_id, &token)
            .map_err(|e| ExchangeError::InvalidConfiguration(e.to_string()))?;

        info!(account_id, client_id, state_id = state.id, "Issued Slack authorization link");
        Ok(url)
    }

    /// Finish the install: validate `state`, exchange `code`, persist the result
    /// and redeem the state so it cannot be used again.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
    ) -> Result<CompletedAuthorization, ExchangeError> {
        let result = self.complete(code, state).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::counter!("oauth_exchanges_total", "outcome" => outcome).increment(1);
        result
    }

    async fn complete(
        &self,
        code: &str,
        state: &str,
    ) -> Result<CompletedAuthorization, ExchangeError> {
        let token = StateToken::decode(state).map_err(|e| {
            warn!(error = %e, "Rejected undecodable OAuth state");
            ExchangeError::InvalidState(e)
        })?;
        let StateToken {
            state_id,
            account_id,
            client_id,
        } = token;

        let PendingState {
            state: pending,
            client,
        } = self
            .states
            .find_redeemable(state_id, account_id, client_id, self.state_max_age)
            .await
            .map_err(ExchangeError::persistence(format!(
                "Could not retrieve client info for account_id={account_id}, client_id={client_id}"
            )))?
            .ok_or(ExchangeError::StateNotFound {
                account_id,
                client_id,
            })?;

        // No retry: Slack codes are single-use.
        let slack_token = self
            .exchanger
            .exchange_code(&client.client_id, &client.client_secret, code)
            .await?;

        let txn = self.db.begin().await.map_err(ExchangeError::persistence(
            "Could not start the integration transaction",
        ))?;

        let team = TeamRepository::upsert_with(&txn, &slack_token.team.id, &slack_token.team.name)
            .await
            .map_err(ExchangeError::persistence(format!(
                "Error inserting team slack_team_id={}",
                slack_token.team.id
            )))?;

        let integration = IntegrationRepository::create_with(
            &txn,
            NewIntegration {
                account_id: pending.account_id,
                client_id: pending.client_id,
                team_id: team.id,
                slack_user_id: slack_token.authed_user.id.clone(),
                access_token: slack_token.authed_user.access_token.clone(),
                app_id: slack_token.app_id.clone(),
            },
        )
        .await
        .map_err(ExchangeError::persistence(format!(
            "Error inserting integration for account_id={account_id}, client_id={client_id}, team_id={}",
            team.id
        )))?;

        let state_redeemed = match redeem_in_savepoint(&txn, pending.id).await {
            Ok(true) => true,
            Ok(false) => {
                // Another callback redeemed this state after our lookup.
                txn.rollback().await.map_err(ExchangeError::persistence(
                    "Could not roll back the integration transaction",
                ))?;
                warn!(state_id = pending.id, account_id, client_id, "OAuth state redeemed concurrently");
                return Err(ExchangeError::StateNotFound {
                    account_id,
                    client_id,
                });
            }
            Err(e) => {
                metrics::counter!("oauth_state_redeem_failures_total").increment(1);
                error!(state_id = pending.id, error = %e, "Error redeeming state");
                false
            }
        };

        txn.commit().await.map_err(ExchangeError::persistence(format!(
            "Could not commit the integration for account_id={account_id}, client_id={client_id}"
        )))?;

        info!(
            account_id,
            client_id,
            team_id = team.id,
            integration_id = integration.id,
            "Completed Slack authorization"
        );

        Ok(CompletedAuthorization {
            token: slack_token,
            team,
            integration,
            state_redeemed,
        })
    }
}

/// Run the conditional redemption in a savepoint so a failed statement does not
/// poison the enclosing transaction.
async fn redeem_in_savepoint(txn: &DatabaseTransaction, state_id: i32) -> Result<bool, DbErr> {
    let savepoint = txn.begin().await?;
    match OAuthStateRepository::redeem_with(&savepoint, state_id).await {
        Ok(redeemed) => {
            savepoint.commit().await?;
            Ok(redeemed)
        }
        Err(e) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                warn!(error = %rollback_err, "Could not roll back redemption savepoint");
            }
            Err(e)
        }
    }
}

fn validate_id(name: &str, value: i32) -> Result<(), ExchangeError> {
    if value <= 0 {
        return Err(ExchangeError::InvalidRequest(format!(
            "The {name} query parameter must be a positive integer."
        )));
    }
    Ok(())
}
