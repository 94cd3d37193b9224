//! # Slack Relay Library
//!
//! Completes Slack OAuth installs on behalf of tenant accounts and ingests
//! Events API callbacks.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod exchange;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod slack;
pub mod state_token;
pub mod telemetry;
pub use migration;
