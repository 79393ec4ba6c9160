//! CSV export and import commands

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use easyfinance_core::db::Database;
use easyfinance_core::{export_csv, import_csv};

pub fn cmd_export(db: &Database, output: &Path) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut out = BufWriter::new(file);
    let stats = export_csv(db, &mut out, &Local).context("Export failed")?;
    out.flush()?;

    println!("✅ Exported to {}", output.display());
    println!("   Transactions: {}", stats.transactions);
    println!("   Templates:    {}", stats.templates);

    Ok(())
}

pub fn cmd_import(db: &Database, file: &Path) -> Result<()> {
    println!("📥 Importing {}...", file.display());

    let input =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let stats = import_csv(db, BufReader::new(input), &Local).context("Import failed")?;

    for (label, section) in [
        ("Transactions", stats.transactions),
        ("Templates", stats.templates),
    ] {
        println!(
            "   {:<13} {} new, {} updated",
            format!("{}:", label),
            section.inserted,
            section.updated
        );
        if section.skipped > 0 {
            println!("   {:<13} {} unreadable row(s) skipped", "", section.skipped);
        }
    }
    println!("✅ Import complete");

    Ok(())
}
