//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `resolve_db_path` - Pick the database file from flag, env or default
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_reset` - Clear all records

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use easyfinance_core::db::{Database, DB_PATH_ENV, DEFAULT_DB_PATH};
use easyfinance_core::models::DEFAULT_CATEGORIES;

/// `--db` wins, then `EASYFINANCE_DB`, then `easyfinance.db`
pub fn resolve_db_path(flag: Option<&Path>) -> PathBuf {
    let env = std::env::var(DB_PATH_ENV).ok();
    db_path_from(flag, env.as_deref())
}

/// Resolution order with the environment value passed in
pub fn db_path_from(flag: Option<&Path>, env: Option<&str>) -> PathBuf {
    match (flag, env) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_DB_PATH),
    }
}

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let existing = db.count_transactions().context("Failed to read database")?;
    if existing > 0 {
        println!("   Found {} existing transactions", existing);
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Categories: {}", DEFAULT_CATEGORIES.join(", "));
    println!();
    println!("Next steps:");
    println!("  1. Record your salary: easyfinance add 10000 --category Sueldo --income --recurrence monthly");
    println!("  2. Create due payments: easyfinance generate");

    Ok(())
}

pub fn cmd_reset(db: &Database, yes: bool) -> Result<()> {
    if !yes {
        println!(
            "⚠️  This will delete every transaction and recurring template in {}.",
            db.path()
        );
        print!("Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let transactions = db.count_transactions()?;
    db.reset().context("Failed to reset database")?;

    println!("✅ Database reset complete.");
    println!("   Removed {} transaction(s) and all templates", transactions);

    Ok(())
}
