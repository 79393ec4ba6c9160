//! Recurring generation command

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use easyfinance_core::db::Database;
use easyfinance_core::{BackfillPolicy, Config, GenerationReport, RecurringGenerator};

use super::{format_amount, format_date};

/// One generation pass at `now`, honoring the configured backfill policy
/// unless `backfill` forces it on
pub fn run_generation<Tz: TimeZone>(
    db: &Database,
    config: &Config,
    backfill: bool,
    now: &DateTime<Tz>,
) -> Result<GenerationReport> {
    let mut generator = RecurringGenerator::with_config(db, config);
    if backfill {
        generator = generator.backfill(BackfillPolicy::Backfill);
    }
    generator.run(now).context("Generation run failed")
}

pub fn cmd_generate(db: &Database, config: &Config, backfill: bool, json: bool) -> Result<()> {
    let report = run_generation(db, config, backfill, &Local::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "🔁 Checked {} recurring template(s)",
        report.templates_evaluated
    );
    if report.generated.is_empty() {
        println!("   Nothing due right now");
    }
    for occurrence in &report.generated {
        let sign = if occurrence.is_income { "+" } else { "-" };
        println!(
            "   ➕ #{} {} {}{} {}",
            occurrence.transaction_id,
            format_date(Some(occurrence.date)),
            sign,
            format_amount(occurrence.amount),
            occurrence.category
        );
    }
    if report.already_present > 0 {
        println!("   {} already recorded", report.already_present);
    }
    if report.failed > 0 {
        println!(
            "   ⚠️  {} template(s) failed, run with --verbose for details",
            report.failed
        );
    }

    Ok(())
}
