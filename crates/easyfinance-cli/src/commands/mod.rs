//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database setup (init) and shared utilities (open_db)
//! - `generate` - Recurring generation run
//! - `import` - CSV export and import
//! - `reports` - Summary, category, fortnight, tax and filtered report commands
//! - `templates` - Recurring template management
//! - `transactions` - Transaction commands (add, list, edit, delete)

pub mod core;
pub mod generate;
pub mod import;
pub mod reports;
pub mod templates;
pub mod transactions;

// Re-export command functions for main.rs
pub use self::core::*;
pub use generate::*;
pub use import::*;
pub use reports::*;
pub use templates::*;
pub use transactions::*;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use easyfinance_core::RecurrenceType;

/// Date format used for input and display
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Format an amount as córdobas with thousands separators, e.g. `C$ 1,234.50`
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}C$ {}.{:02}", sign, grouped, cents % 100)
}

/// Parse a day given as DD/MM/YYYY (or ISO YYYY-MM-DD)
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .with_context(|| format!("Invalid date '{}' (use DD/MM/YYYY)", input))
}

/// Midnight of a local calendar day, as stored
pub fn local_day_start(day: NaiveDate) -> Result<DateTime<Utc>> {
    let local = Local
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .with_context(|| format!("{} has no local midnight", day))?;
    Ok(local.with_timezone(&Utc))
}

pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d
            .with_timezone(&Local)
            .date_naive()
            .format(DATE_FORMAT)
            .to_string(),
        None => "--/--/----".to_string(),
    }
}

pub fn parse_recurrence(input: &str) -> Result<RecurrenceType> {
    match input.parse() {
        Ok(recurrence) => Ok(recurrence),
        Err(e) => bail!("{} (use weekly, biweekly or monthly)", e),
    }
}
