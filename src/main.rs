//! # Bookshelf Main Entry Point
//!
//! Loads configuration, provisions and seeds the database, then serves HTTP.

use bookshelf::{
    config::ConfigLoader,
    server::run_server,
    startup::{Bootstrapped, bootstrap},
    telemetry::init_tracing,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Authors, books and reviews service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Provision and seed the database, then serve HTTP (default)
    Serve,
    /// Provision and seed the database, then exit
    Provision,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    init_tracing(&config)?;

    tracing::info!(
        environment = %config.environment,
        backend = %config.backend(),
        "loaded configuration"
    );
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let Bootstrapped { db, report } = match bootstrap(&config).await {
        Ok(bootstrapped) => bootstrapped,
        Err(err) => {
            tracing::error!(kind = %err.kind(), error = %err, "startup aborted");
            return Err(err.into());
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Provision => {
            tracing::info!(
                schema = ?report.schema,
                seed = ?report.seed,
                degraded = report.is_degraded(),
                "provisioning finished"
            );
            Ok(())
        }
        Command::Serve => run_server(config, db).await,
    }
}
