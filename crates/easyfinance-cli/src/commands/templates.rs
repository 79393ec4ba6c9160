//! Recurring template command implementations

use anyhow::{bail, Context, Result};
use chrono::Local;
use easyfinance_core::db::Database;
use easyfinance_core::{Config, Ledger};

use super::{format_amount, format_date, record_from_args};
use crate::cli::RecordArgs;

pub fn cmd_templates_list(db: &Database, json: bool) -> Result<()> {
    let templates = db.list_templates()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!("No recurring templates. Add one with:");
        println!("  easyfinance templates add 3500 --category Hogar --recurrence monthly");
        return Ok(());
    }

    println!();
    println!("🔁 Recurring Templates");
    println!("   ─────────────────────────────────────────────────────────────");

    for t in &templates {
        let sign = if t.is_income { "+" } else { "-" };
        let repeat = t.recurrence_type.map(|r| r.label()).unwrap_or("(inactive)");
        let link = t
            .paired_with
            .map(|p| format!(" (tax for #{})", p))
            .unwrap_or_default();
        println!(
            "   [{}] from {} │ {}{:>14} │ {:<16} {}{}",
            t.id,
            format_date(t.start_date),
            sign,
            format_amount(t.amount),
            t.category,
            repeat,
            link
        );
    }

    Ok(())
}

pub fn cmd_templates_add(db: &Database, config: &Config, args: &RecordArgs) -> Result<()> {
    if args.recurrence.is_none() {
        bail!("A template needs --recurrence (weekly, biweekly or monthly)");
    }

    let record = record_from_args(args, Local::now().date_naive())?;
    let recorded = Ledger::with_config(db, config)
        .record_template(&record)
        .context("Failed to add template")?;

    println!(
        "✅ Added template #{}: {} {} from {}",
        recorded.template_id.unwrap_or_default(),
        format_amount(record.amount),
        record.category,
        format_date(record.start_date)
    );
    if let Some(tax_id) = recorded.tax_template_id {
        println!("   🧾 Paired withholding template #{}", tax_id);
    }

    Ok(())
}

pub fn cmd_templates_delete(db: &Database, config: &Config, id: i64) -> Result<()> {
    let deleted = Ledger::with_config(db, config)
        .delete_template(id)
        .with_context(|| format!("Failed to delete template {}", id))?;

    println!("🗑️  Deleted {} template(s)", deleted.templates);
    println!("   Transactions already created are kept.");

    Ok(())
}
