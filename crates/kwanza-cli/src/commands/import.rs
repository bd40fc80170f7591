//! Import command implementation

use std::path::Path;

use anyhow::{bail, Context, Result};

use kwanza_core::ingest::{self, FileFormat};

use super::open_db;

pub fn cmd_import(db_path: &Path, file: &Path, no_encrypt: bool) -> Result<()> {
    let filename = file.to_string_lossy();
    let Some(format) = FileFormat::from_filename(&filename) else {
        bail!(
            "Unsupported file type: {} (expected .csv or .xlsx)",
            file.display()
        );
    };

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let db = open_db(db_path, no_encrypt)?;
    let report = ingest::ingest(&db, format, &bytes)?;

    println!(
        "✅ Imported {} transactions from {}",
        report.imported,
        file.display()
    );

    if !report.errors.is_empty() {
        println!("⚠️  {} rows failed validation:", report.errors.len());
        for error in &report.errors {
            println!("   {}", error);
        }
    }

    Ok(())
}
