//! Admin CLI for Slack application registrations.
//!
//! ```text
//! register-client add --client-id 123.456 --client-secret s3cret --name "Main app"
//! register-client list
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slack_relay::{config::ConfigLoader, db, repositories::ClientRepository};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "register-client", about = "Manage Slack client registrations")]
struct Cli {
    /// Apply pending migrations before running the command
    #[arg(long)]
    migrate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a Slack application
    Add {
        /// Public Slack client id
        #[arg(long)]
        client_id: String,
        /// Slack client secret
        #[arg(long, env = "SLACK_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
        /// Human-readable label
        #[arg(long)]
        name: Option<String>,
    },
    /// List registrations (secrets are not printed)
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    let pool = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    if cli.migrate {
        db::run_migrations(&pool).await?;
    }

    let clients = ClientRepository::new(Arc::new(pool));

    match cli.command {
        Command::Add {
            client_id,
            client_secret,
            name,
        } => {
            let client = clients
                .create(&client_id, &client_secret, name.as_deref())
                .await
                .context("inserting client registration")?;
            println!("Registered client {} (slack client id {})", client.id, client.client_id);
        }
        Command::List => {
            for client in clients.list().await.context("listing client registrations")? {
                println!(
                    "{}\t{}\t{}",
                    client.id,
                    client.client_id,
                    client.name.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}
