use anyhow::Result;
use clap::{Parser, Subcommand};
use eth_tx_api::application::app;
use eth_tx_api::config::Config;
use eth_tx_api::infrastructure::seeder::{seed_accounts, SEED_ACCOUNTS};
use eth_tx_api::infrastructure::sqlite::SqliteStore;
use eth_tx_api::service;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Ethereum account transaction history with REST API"
)]
struct TxApiProgram {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate the database schema
    Migrate,
    /// Seed the database with the provisioned accounts
    Seed,
    /// Migrate, seed and start the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = TxApiProgram::parse();
    let database = Arc::new(SqliteStore::open(&args.config.database)?);

    match args.command {
        Command::Migrate => database.migrate()?,
        Command::Seed => {
            seed_accounts(database.as_ref(), &SEED_ACCOUNTS).await;
        }
        Command::Serve => {
            database.migrate()?;
            seed_accounts(database.as_ref(), &SEED_ACCOUNTS).await;
            serve(&args.config, database).await?;
        }
    }

    Ok(())
}

async fn serve(config: &Config, database: Arc<SqliteStore>) -> Result<()> {
    // Create a shutdown channel
    let (shutdown_sender, _) = broadcast::channel(1);

    let app = Arc::new(app::App::new(config, database));

    // Start the API server
    let server_config = config.clone();
    let server_shutdown = shutdown_sender.clone();
    let mut server_handle = tokio::spawn(async move {
        service::api::start_server(server_shutdown, app, &server_config).await
    });

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        result = &mut server_handle => {
            result??;
            tracing::warn!("API server exited, shutting down...");
        }
        signal = signal::ctrl_c() => {
            signal?;
            tracing::warn!("Received Ctrl+C, shutting down...");
            let _ = shutdown_sender.send(());

            // Wait for the server to complete
            server_handle.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
