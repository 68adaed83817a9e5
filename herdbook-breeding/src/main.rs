//! Breeding service (herdbook-breeding) - Main entry point
//!
//! Hosts the offspring lifecycle and group linkage operations behind a
//! small HTTP surface. One SQLite database serves the whole deployment;
//! rows are scoped per tenant.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herdbook_common::config::resolve_database_path;
use herdbook_common::db::init_database;

/// Command-line arguments for herdbook-breeding
#[derive(Parser, Debug)]
#[command(name = "herdbook-breeding")]
#[command(about = "Breeding service for the Herdbook platform")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5830", env = "HERDBOOK_PORT")]
    port: u16,

    /// SQLite database path (falls back to env, config file, then default)
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herdbook_breeding=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let db_path = resolve_database_path(args.database.as_deref(), "HERDBOOK_DB")
        .context("Failed to resolve database path")?;
    info!("Database: {}", db_path.display());

    let db = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let bind_addr = format!("0.0.0.0:{}", args.port);
    info!("Starting Herdbook breeding service on port {}", args.port);

    herdbook_breeding::server::start(&bind_addr, db).await
}
