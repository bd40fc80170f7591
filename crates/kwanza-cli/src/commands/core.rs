//! Database initialization

use std::path::Path;

use anyhow::{Context, Result};

use kwanza_core::db::Database;

/// Open the database, encrypted unless --no-encrypt was passed
pub fn open_db(path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = path.to_string_lossy();
    let db = if no_encrypt {
        Database::new_unencrypted(&path_str)
    } else {
        Database::new(&path_str)
    }
    .with_context(|| format!("Failed to open database at {}", path.display()))?;

    Ok(db)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;
    println!("✅ Database initialized at {}", db.path());
    if no_encrypt {
        println!("   ⚠️  Encryption disabled - set KWANZA_DB_KEY and drop --no-encrypt for production");
    }
    Ok(())
}
