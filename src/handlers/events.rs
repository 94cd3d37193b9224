//! # Event Handler
//!
//! `POST /event` receives Slack Events API callbacks. The body is taken as raw
//! bytes so it can be archived exactly as sent.

use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    response::Json,
};

use crate::error::ApiError;
use crate::events::EventResponse;
use crate::server::AppState;

/// Receive a Slack event
#[utoipa::path(
    post,
    path = "/event",
    request_body(content = String, description = "Raw Slack Events API payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Challenge echo or acknowledgment", body = EventResponse),
        (status = 500, description = "Body could not be read or parsed", body = ApiError)
    ),
    tag = "events"
)]
pub async fn receive_event(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EventResponse>, ApiError> {
    let body = body.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Could not read event body");
        ApiError::internal("Could not read the request body.")
    })?;

    let response = state.events.process(&body).await?;
    Ok(Json(response))
}
