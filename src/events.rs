//! # Event Ingestion
//!
//! Slack Events API callbacks. Every body is archived verbatim before it is
//! parsed; archival is best-effort and never blocks the acknowledgment.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use utoipa::ToSchema;

use sea_orm::DatabaseConnection;

use crate::repositories::RawEventRepository;

pub const EVENT_CALLBACK_ACK: &str = "Message received.";
pub const UNKNOWN_EVENT_ACK: &str = "Unknown event type.";

/// Event ingestion errors
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Could not parse the request body: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

/// Outer event types this service distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    UrlVerification,
    EventCallback,
    /// Anything else, including a missing `type`
    Unknown,
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "url_verification" => EventKind::UrlVerification,
            "event_callback" => EventKind::EventCallback,
            _ => EventKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UrlVerification => "url_verification",
            EventKind::EventCallback => "event_callback",
            EventKind::Unknown => "unknown",
        }
    }
}

/// Inner event of an `event_callback`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InnerEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
}

/// The subset of the Events API envelope the dispatcher reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Only present on `url_verification`
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub api_app_id: Option<String>,
    #[serde(default)]
    pub event_context: Option<String>,
    #[serde(default)]
    pub event: Option<InnerEvent>,
}

impl EventEnvelope {
    pub fn kind(&self) -> EventKind {
        EventKind::from_tag(&self.event_type)
    }
}

/// Body returned to Slack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum EventResponse {
    /// Echo of the verification challenge
    Challenge { challenge: String },
    /// Static acknowledgment
    Message { message: String },
}

/// Choose the response for an envelope.
pub fn dispatch(envelope: &EventEnvelope) -> EventResponse {
    match envelope.kind() {
        EventKind::UrlVerification => {
            let challenge = envelope.challenge.clone().unwrap_or_default();
            info!(challenge = %challenge, "Handling URL verification request");
            EventResponse::Challenge { challenge }
        }
        EventKind::EventCallback => {
            let inner = envelope
                .event
                .as_ref()
                .map(|e| e.event_type.as_str())
                .unwrap_or_default();
            info!(
                event_type = inner,
                team_id = envelope.team_id.as_deref().unwrap_or_default(),
                "Handling event_callback event"
            );
            EventResponse::Message {
                message: EVENT_CALLBACK_ACK.to_string(),
            }
        }
        EventKind::Unknown => {
            info!(event_type = %envelope.event_type, "Handling unknown event type");
            EventResponse::Message {
                message: UNKNOWN_EVENT_ACK.to_string(),
            }
        }
    }
}

/// Archives and dispatches inbound event bodies
pub struct EventProcessor {
    raw_events: RawEventRepository,
}

impl EventProcessor {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            raw_events: RawEventRepository::new(db),
        }
    }

    /// Archive `body`, then parse and dispatch it.
    pub async fn process(&self, body: &[u8]) -> Result<EventResponse, EventError> {
        if let Err(e) = self.raw_events.insert(body).await {
            metrics::counter!("raw_event_archive_failures_total").increment(1);
            error!(error = %e, bytes = body.len(), "Could not archive raw event");
        }

        // A JSON `null` body dispatches like an empty envelope.
        let envelope = serde_json::from_slice::<Option<EventEnvelope>>(body)?.unwrap_or_default();
        let kind = envelope.kind();
        metrics::counter!("events_received_total", "kind" => kind.as_str()).increment(1);

        Ok(dispatch(&envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_db;
    use serde_json::json;

    fn parse(body: &str) -> EventEnvelope {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(EventKind::from_tag("url_verification"), EventKind::UrlVerification);
        assert_eq!(EventKind::from_tag("event_callback"), EventKind::EventCallback);
        assert_eq!(EventKind::from_tag("app_rate_limited"), EventKind::Unknown);
        assert_eq!(EventKind::from_tag(""), EventKind::Unknown);
    }

    #[test]
    fn test_url_verification_echoes_challenge() {
        let response = dispatch(&parse(r#"{"type":"url_verification","challenge":"abc123"}"#));
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({ "challenge": "abc123" })
        );
    }

    #[test]
    fn test_event_callback_acknowledged() {
        let response = dispatch(&parse(r#"{"type":"event_callback","event":{"type":"message"}}"#));
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({ "message": "Message received." })
        );
    }

    #[test]
    fn test_unknown_type_and_missing_type() {
        for body in [r#"{"type":"something_new"}"#, "{}"] {
            assert_eq!(
                dispatch(&parse(body)),
                EventResponse::Message {
                    message: UNKNOWN_EVENT_ACK.to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_process_archives_even_unparsable_bodies() {
        let db = memory_db().await;
        let processor = EventProcessor::new(db.clone());

        let result = processor.process(b"not json").await;
        assert!(matches!(result, Err(EventError::MalformedEvent(_))));

        let ok = processor
            .process(br#"{"type":"url_verification","challenge":"xyz"}"#)
            .await
            .unwrap();
        assert_eq!(
            ok,
            EventResponse::Challenge {
                challenge: "xyz".to_string()
            }
        );

        let archived = RawEventRepository::new(db);
        assert_eq!(archived.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_null_body_is_unknown_event() {
        let db = memory_db().await;
        let processor = EventProcessor::new(db);

        let response = processor.process(b"null").await.unwrap();
        assert_eq!(
            response,
            EventResponse::Message {
                message: UNKNOWN_EVENT_ACK.to_string()
            }
        );
    }
}
