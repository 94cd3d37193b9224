//! # State Token Codec
//!
//! Encodes the `(state_id, account_id, client_id)` triple carried through the
//! Slack authorize redirect as the OAuth `state` parameter.
//!
//! The token is JSON wrapped in URL-safe base64. It carries no integrity
//! protection of its own: a decoded token is only trusted once it matches a
//! non-redeemed `oauth_state` row.

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// URL-safe alphabet, no padding emitted, padding optional on decode so tokens
/// that picked up `=` in transit still parse.
const STATE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced while decoding a state token
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateTokenError {
    /// The text could not be turned back into bytes
    #[error("state token is not valid URL-safe base64: {0}")]
    MalformedToken(String),
    /// The bytes did not hold the expected JSON record
    #[error("state token payload is malformed: {0}")]
    MalformedPayload(String),
}

/// Decoded contents of a state token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateToken {
    pub state_id: i32,
    pub account_id: i32,
    pub client_id: i32,
}

impl StateToken {
    pub fn new(state_id: i32, account_id: i32, client_id: i32) -> Self {
        Self {
            state_id,
            account_id,
            client_id,
        }
    }

    /// Serialize into the opaque string placed in the redirect URL.
    pub fn encode(&self) -> String {
        let json = serde_json::json!({
            "state_id": self.state_id,
            "account_id": self.account_id,
            "client_id": self.client_id,
        });
        STATE_ENGINE.encode(json.to_string())
    }

    /// Parse a token previously produced by [`StateToken::encode`].
    pub fn decode(token: &str) -> Result<Self, StateTokenError> {
        let bytes = STATE_ENGINE
            .decode(token.trim())
            .map_err(|e| StateTokenError::MalformedToken(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| StateTokenError::MalformedPayload(e.to_string()))
    }
}

/// Convenience wrapper over [`StateToken::encode`].
pub fn encode(state_id: i32, account_id: i32, client_id: i32) -> String {
    StateToken::new(state_id, account_id, client_id).encode()
}

/// Convenience wrapper over [`StateToken::decode`].
pub fn decode(token: &str) -> Result<StateToken, StateTokenError> {
    StateToken::decode(token)
}
