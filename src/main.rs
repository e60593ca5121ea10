use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod api;
mod bets;
mod commands;
mod config;
mod db;
mod display;
mod error;
mod live;
mod normalize;
mod wallet;

use commands::App;
use config::Config;
use db::Database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging (stderr, so rendered output stays clean)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Local store for the session token and preferences
    let db = Database::open(&config.database_path)?;
    debug!("Database opened: {}", config.database_path);

    App::new(config, db)?.run().await
}
