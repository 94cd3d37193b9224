//! # OAuth Handlers
//!
//! `GET /redirect-link` starts a Slack install for an (account, client) pair;
//! `GET /authorization` is the callback Slack redirects back to.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::server::AppState;

/// Query parameters for `/redirect-link`, parsed by hand for exact error messages
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RedirectLinkQuery {
    /// Tenant account requesting the install
    #[param(value_type = i32)]
    pub account_id: Option<String>,
    /// Client registration to install with
    #[param(value_type = i32)]
    pub client_id: Option<String>,
}

/// Query parameters Slack sends to the callback
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizationQuery {
    /// Authorization code to exchange
    pub code: Option<String>,
    /// State token issued with the redirect link
    pub state: Option<String>,
    /// Set by Slack instead of `code` when the user declines
    pub error: Option<String>,
}

fn parse_id(name: &str, raw: Option<&str>) -> Result<i32, ApiError> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
        ApiError::bad_request(format!("The {name} query parameter is required."))
    })?;

    raw.parse::<i32>().map_err(|_| {
        ApiError::bad_request(format!("The {name} query parameter must be an integer."))
    })
}

/// Redirect the user to Slack's authorize page
#[utoipa::path(
    get,
    path = "/redirect-link",
    params(RedirectLinkQuery),
    responses(
        (status = 302, description = "Redirect to the Slack authorize page"),
        (status = 400, description = "Missing, non-integer or non-positive id", body = ApiError),
        (status = 500, description = "State could not be recorded or the client is unknown", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn redirect_link(
    State(state): State<AppState>,
    Query(query): Query<RedirectLinkQuery>,
) -> Result<Response, ApiError> {
    let account_id = parse_id("account_id", query.account_id.as_deref())?;
    let client_id = parse_id("client_id", query.client_id.as_deref())?;

    let url = state
        .exchange
        .build_authorization_link(account_id, client_id)
        .await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}

/// Complete the Slack install
#[utoipa::path(
    get,
    path = "/authorization",
    params(AuthorizationQuery),
    responses(
        (status = 204, description = "Integration stored"),
        (status = 500, description = "The callback could not be completed", body = ApiError)
    ),
    tag = "oauth"
)]
pub async fn authorization(
    State(state): State<AppState>,
    Query(query): Query<AuthorizationQuery>,
) -> Result<StatusCode, ApiError> {
    if let Some(error) = query.error.as_deref().filter(|e| !e.is_empty()) {
        tracing::info!(error, "Slack authorization was not granted");
        return Err(ApiError::internal(format!(
            "Slack authorization was not granted: {error}"
        )));
    }

    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::internal("The code query parameter is required."))?;
    let state_token = query.state.as_deref().unwrap_or_default();

    state
        .exchange
        .complete_authorization(code, state_token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
