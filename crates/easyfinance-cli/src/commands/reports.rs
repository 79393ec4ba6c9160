//! Report command implementations

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use easyfinance_core::db::Database;
use easyfinance_core::{
    category_totals, export_report_csv, fortnight_totals, parse_amount, summarize, Config,
    ReportFilter,
};

use super::{format_amount, parse_date, parse_recurrence};

pub fn cmd_summary(db: &Database, json: bool) -> Result<()> {
    let transactions = db.list_transactions()?;
    let summary = summarize(&transactions, &Local::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("💰 Balance");
    println!("   ─────────────────────────────────");
    println!("   Income    {:>20}", format_amount(summary.total_income));
    println!("   Expenses  {:>20}", format_amount(summary.total_expenses));
    println!("   Balance   {:>20}", format_amount(summary.balance));
    println!();
    println!("   {} transaction(s) up to today", summary.transaction_count);

    Ok(())
}

pub fn cmd_categories(db: &Database, json: bool) -> Result<()> {
    let transactions = db.list_transactions()?;
    let totals = category_totals(&transactions);

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    if totals.income.is_empty() && totals.expenses.is_empty() {
        println!("No transactions recorded yet.");
        return Ok(());
    }

    for (title, section) in [("📈 Income", &totals.income), ("📉 Expenses", &totals.expenses)] {
        if section.is_empty() {
            continue;
        }
        println!();
        println!("{} by category", title);
        println!("   ─────────────────────────────────");
        for (category, amount) in section {
            println!("   {:<18} {:>16}", category, format_amount(*amount));
        }
    }

    Ok(())
}

pub fn cmd_fortnights(db: &Database, json: bool) -> Result<()> {
    let transactions = db.list_transactions()?;
    let windows = fortnight_totals(&transactions, &Local::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }

    println!();
    println!("📅 Fortnights");
    println!("   ─────────────────────────────────────────────────");
    for window in &windows {
        let marker = if window.current { "▶" } else { " " };
        println!(
            " {} {} │ income {:>14} │ expenses {:>14}",
            marker,
            window.label,
            format_amount(window.income),
            format_amount(window.expenses)
        );
    }

    Ok(())
}

pub fn cmd_tax(config: &Config, amount: &str, recurrence: &str, json: bool) -> Result<()> {
    let gross = parse_amount(amount).with_context(|| format!("Invalid amount '{}'", amount))?;
    let recurrence = parse_recurrence(recurrence)?;
    let breakdown = config.tax.estimate(gross, Some(recurrence));

    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
        return Ok(());
    }

    println!();
    println!(
        "🧾 Withholding for {} ({})",
        format_amount(gross),
        recurrence.label()
    );
    println!("   ─────────────────────────────────");
    println!(
        "   Social security    {:>16}",
        format_amount(breakdown.social_security)
    );
    println!(
        "   Income tax         {:>16}",
        format_amount(breakdown.income_tax)
    );
    println!("   Total              {:>16}", format_amount(breakdown.total));
    println!();
    println!(
        "   Annual net {} over {} periods, annual tax {}",
        format_amount(breakdown.annual_net),
        breakdown.periods_per_year,
        format_amount(breakdown.annual_income_tax)
    );

    Ok(())
}

/// Translate `report` flags into a validated filter
pub fn build_report_filter(
    category: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
    show_incomes: bool,
    show_expenses: bool,
    show_recurring: bool,
    show_non_recurring: bool,
) -> Result<ReportFilter> {
    let filter = ReportFilter {
        category: category.filter(|c| !c.trim().is_empty()),
        start: from.map(parse_date).transpose()?,
        end: to.map(parse_date).transpose()?,
        show_incomes,
        show_expenses,
        show_recurring,
        show_non_recurring,
    };
    filter.validate()?;
    Ok(filter)
}

pub fn cmd_report(db: &Database, filter: &ReportFilter, output: &Path) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut out = BufWriter::new(file);
    let written =
        export_report_csv(db, filter, &mut out, &Local).context("Failed to write report")?;
    out.flush()?;

    println!(
        "✅ Exported {} transaction(s) to {}",
        written,
        output.display()
    );

    Ok(())
}
