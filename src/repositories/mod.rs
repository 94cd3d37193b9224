//! # Repository Layer
//!
//! Repository implementations encapsulating SeaORM operations for the relay's
//! entities. Operations that must join the OAuth callback transaction are
//! associated functions taking an explicit connection (`*_with`).

pub mod client;
pub mod integration;
pub mod oauth_state;
pub mod raw_event;
pub mod team;

pub use client::ClientRepository;
pub use integration::{IntegrationRepository, NewIntegration};
pub use oauth_state::{OAuthStateRepository, PendingState};
pub use raw_event::RawEventRepository;
pub use team::TeamRepository;
