//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Kwanza web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    if std::env::var("GEMINI_API_KEY").is_ok() {
        println!("   🤖 AI analysis: Gemini");
    } else {
        println!("   🤖 AI analysis: sample mode (set GEMINI_API_KEY for live analysis)");
    }

    let db = open_db(db_path, no_encrypt)?;

    let static_str = static_dir.map(|p| p.to_string_lossy().to_string());
    kwanza_server::serve(db, host, port, static_str.as_deref()).await
}
