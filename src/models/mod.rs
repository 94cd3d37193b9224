//! # Data Models
//!
//! This module contains the SeaORM entities persisted by the relay and the
//! small response types shared by handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod client;
pub mod integration;
pub mod oauth_state;
pub mod raw_event;
pub mod team;

pub use client::Entity as Client;
pub use integration::Entity as Integration;
pub use oauth_state::Entity as OAuthState;
pub use raw_event::Entity as RawEvent;
pub use team::Entity as Team;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "slack-relay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
