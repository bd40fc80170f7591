//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kwanza - financial record keeping with AI-assisted analysis
#[derive(Parser)]
#[command(name = "kwanza")]
#[command(about = "Finance backend: transaction ingestion and AI analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to KWANZA_DB or kwanza.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default the database is encrypted using SQLCipher.
    /// Set KWANZA_DB_KEY with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolve the database path: --db flag > KWANZA_DB env > default
    pub fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| {
            std::env::var("KWANZA_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("kwanza.db"))
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from a CSV or XLSX file
    Import {
        /// File to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Start the web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 5000)]
        port: u16,

        /// Directory with the front-end tab bundles
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}
