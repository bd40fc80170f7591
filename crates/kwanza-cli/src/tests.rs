//! CLI tests

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Commands};

#[test]
fn test_parse_import_command() {
    let cli = Cli::parse_from(["kwanza", "import", "--file", "txs.csv"]);
    match cli.command {
        Commands::Import { file } => assert_eq!(file, PathBuf::from("txs.csv")),
        _ => panic!("expected import command"),
    }
}

#[test]
fn test_parse_serve_defaults() {
    let cli = Cli::parse_from(["kwanza", "serve"]);
    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(port, 5000);
            assert!(static_dir.is_none());
        }
        _ => panic!("expected serve command"),
    }
}

#[test]
fn test_db_flag_overrides_default() {
    let cli = Cli::parse_from(["kwanza", "--db", "custom.db", "init"]);
    assert_eq!(cli.db_path(), PathBuf::from("custom.db"));
}

#[test]
fn test_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");

    crate::commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());
}
