//! Kwanza CLI - financial records backend with AI analysis
//!
//! Usage:
//!   kwanza init                     Initialize database
//!   kwanza import --file FILE       Import transactions from CSV/XLSX
//!   kwanza serve --port 5000        Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = cli.db_path();

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, cli.no_encrypt),
        Commands::Import { file } => commands::cmd_import(&db_path, &file, cli.no_encrypt),
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            commands::cmd_serve(&db_path, &host, port, static_dir.as_deref(), cli.no_encrypt).await
        }
    }
}
