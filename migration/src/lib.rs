//! Database migrations for the Slack relay.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_06_01_000001_create_client;
mod m2024_06_01_000002_create_oauth_state;
mod m2024_06_01_000003_create_team;
mod m2024_06_01_000004_create_integration;
mod m2024_06_01_000005_create_raw_event;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_06_01_000001_create_client::Migration),
            Box::new(m2024_06_01_000002_create_oauth_state::Migration),
            Box::new(m2024_06_01_000003_create_team::Migration),
            Box::new(m2024_06_01_000004_create_integration::Migration),
            Box::new(m2024_06_01_000005_create_raw_event::Migration),
        ]
    }
}
