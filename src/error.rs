//! # Error Handling
//!
//! Unified HTTP error handling for the relay. Every failure leaves the service as
//! `{"error": "<message>"}`; only caller-input problems are distinguished (400), all
//! downstream failures collapse to a flat 500.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::events::EventError;
use crate::exchange::ExchangeError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: Box<str>,
    /// Correlation trace ID, echoed separately as `x-request-id`
    #[serde(skip_serializing, skip_deserializing)]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into().into_boxed_str(),
            trace_id: telemetry::current_trace_id().map(String::into_boxed_str),
        }
    }

    /// 400 for malformed caller input
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500 for any downstream failure
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<ExchangeError> for ApiError {
    fn from(error: ExchangeError) -> Self {
        match &error {
            ExchangeError::InvalidRequest(_) => {
                tracing::debug!(error = %error, "Rejected OAuth request");
                Self::bad_request(error.to_string())
            }
            _ => {
                tracing::error!(error = ?error, "OAuth exchange failed");
                Self::internal(error.to_string())
            }
        }
    }
}

impl From<EventError> for ApiError {
    fn from(error: EventError) -> Self {
        tracing::warn!(error = %error, "Event ingestion failed");
        Self::internal(error.to_string())
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error {
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::internal("Database error occurred")
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // Log the full error for debugging
        tracing::error!("Internal error: {:?}", error);

        Self::internal("An internal error occurred")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_token::StateTokenError;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response = ApiError::bad_request("nope").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await, json!({ "error": "nope" }));
    }

    #[tokio::test]
    async fn test_trace_id_is_captured_from_context() {
        let error = telemetry::with_trace_context(
            telemetry::TraceContext {
                trace_id: "req-42".to_string(),
            },
            async { ApiError::internal("boom") },
        )
        .await;

        assert_eq!(error.trace_id.as_deref(), Some("req-42"));
        // Not part of the body.
        assert_eq!(
            body_json(error.into_response()).await,
            json!({ "error": "boom" })
        );
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        let error: ApiError = ExchangeError::InvalidRequest("account_id must be positive".into()).into();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(&*error.message, "account_id must be positive");
    }

    #[test]
    fn test_invalid_state_is_opaque() {
        let error: ApiError =
            ExchangeError::InvalidState(StateTokenError::MalformedToken("Invalid byte 42".into()))
                .into();
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&*error.message, "Could not decode the state.");
        assert!(!error.message.contains("42"));
    }

    #[test]
    fn test_state_not_found_maps_to_500() {
        let error: ApiError = ExchangeError::StateNotFound {
            account_id: 3,
            client_id: 4,
        }
        .into();
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.message.contains("account_id=3"));
    }

    #[test]
    fn test_malformed_event_maps_to_500() {
        let parse_error = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let error: ApiError = EventError::MalformedEvent(parse_error).into();
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.message.starts_with("Could not parse the request body"));
    }

    #[test]
    fn test_database_error_mapping() {
        let api_error: ApiError = sea_orm::DbErr::Custom("disk full".to_string()).into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&*api_error.message, "Database error occurred");
    }

    #[test]
    fn test_from_anyhow() {
        let api_error: ApiError = anyhow::anyhow!("Something went wrong").into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&*api_error.message, "An internal error occurred");
    }
}
