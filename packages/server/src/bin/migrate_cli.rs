//! Operational CLI for the session store
//!
//! Runs schema migrations and reclaims expired sessions. Output is JSON so
//! deployment tooling can parse it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use server_core::config::Config;
use server_core::kernel::session_store::{BaseSessionStore, PgSessionStore, MIGRATOR};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "migrate_cli")]
#[command(about = "Session store operations (migrate, purge)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Delete sessions past their TTL. Reads stay correct without this
    /// (expired sessions already read as absent); this only frees storage.
    PurgeExpired,
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct Response {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
}

fn output(resp: &Response) -> Result<()> {
    println!("{}", serde_json::to_string(resp)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => cmd_migrate().await,
        Commands::PurgeExpired => cmd_purge_expired().await,
    }
}

async fn get_pool() -> Result<PgPool> {
    let config = Config::from_env()?;
    PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_migrate() -> Result<()> {
    let pool = get_pool().await?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    output(&Response {
        success: true,
        message: Some("migrations applied".to_string()),
        count: None,
    })
}

async fn cmd_purge_expired() -> Result<()> {
    let pool = get_pool().await?;
    let store = PgSessionStore::new(pool);

    let purged = store
        .purge_expired()
        .await
        .context("Failed to purge expired sessions")?;

    output(&Response {
        success: true,
        message: None,
        count: Some(purged),
    })
}
