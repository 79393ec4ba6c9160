//! Transaction command implementations

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use easyfinance_core::db::Database;
use easyfinance_core::{
    parse_amount, Config, DateRange, KindFilter, Ledger, NewTransaction, TransactionFilter,
};

use super::{format_amount, format_date, local_day_start, parse_date, parse_recurrence};
use crate::cli::RecordArgs;

/// Build a payload from `add` arguments; the date defaults to `today`
pub fn record_from_args(args: &RecordArgs, today: NaiveDate) -> Result<NewTransaction> {
    let amount = parse_amount(&args.amount)
        .with_context(|| format!("Invalid amount '{}'", args.amount))?;
    let day = match &args.date {
        Some(d) => parse_date(d)?,
        None => today,
    };
    let start_date = local_day_start(day)?;

    Ok(match &args.recurrence {
        Some(r) => NewTransaction::recurring(
            amount,
            args.category.trim(),
            args.income,
            parse_recurrence(r)?,
            start_date,
        ),
        None => NewTransaction::single(amount, args.category.trim(), args.income, start_date),
    })
}

pub fn cmd_add(db: &Database, config: &Config, args: &RecordArgs) -> Result<()> {
    let record = record_from_args(args, Local::now().date_naive())?;
    let ledger = Ledger::with_config(db, config);
    let recorded = ledger
        .record_transaction(&record)
        .context("Failed to record transaction")?;

    let kind = if record.is_income { "income" } else { "expense" };
    println!(
        "✅ Recorded {} #{}: {} {}",
        kind,
        recorded.transaction_id.unwrap_or_default(),
        format_amount(record.amount),
        record.category
    );
    if let Some(tax_id) = recorded.tax_transaction_id {
        println!(
            "   🧾 Withholding #{}: {}",
            tax_id,
            format_amount(ledger.tax_for(&record).total)
        );
    }
    if let (Some(template_id), Some(recurrence)) = (recorded.template_id, record.recurrence_type) {
        println!(
            "   🔁 Repeats {} (template #{})",
            recurrence.label().to_lowercase(),
            template_id
        );
    }

    Ok(())
}

/// Translate `list` flags into a filter
pub fn build_filter(
    kind: &str,
    range: &str,
    from: Option<&str>,
    to: Option<&str>,
    category: Option<String>,
) -> Result<TransactionFilter> {
    let kind = match kind.to_lowercase().as_str() {
        "all" => KindFilter::All,
        "income" | "incomes" => KindFilter::Income,
        "expense" | "expenses" => KindFilter::Expense,
        other => bail!("Unknown kind '{}' (use all, income or expense)", other),
    };

    let range = match (from, to) {
        (Some(from), Some(to)) => {
            let (from, to) = (parse_date(from)?, parse_date(to)?);
            if from > to {
                bail!("--from must not be after --to");
            }
            DateRange::Custom { from, to }
        }
        _ => match range.to_lowercase().as_str() {
            "all" => DateRange::All,
            "week" | "last-week" => DateRange::LastWeek,
            "month" | "last-month" => DateRange::LastMonth,
            other => bail!("Unknown range '{}' (use all, week or month)", other),
        },
    };

    Ok(TransactionFilter {
        kind,
        range,
        category: category.filter(|c| !c.trim().is_empty()),
    })
}

pub fn cmd_list(db: &Database, filter: &TransactionFilter, json: bool) -> Result<()> {
    let transactions = db.list_transactions()?;
    let filtered = filter.apply(&transactions, &Local::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
        return Ok(());
    }

    if filtered.transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  easyfinance add 250 --category Alimentos");
        return Ok(());
    }

    println!();
    println!("📝 Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in &filtered.transactions {
        let amount_str = if tx.is_income {
            format!("\x1b[32m+{}\x1b[0m", format_amount(tx.amount)) // Green for income
        } else {
            format!("\x1b[31m-{}\x1b[0m", format_amount(tx.amount)) // Red for expenses
        };
        let repeat = tx.recurrence_type.map(|r| r.label()).unwrap_or("");

        println!(
            "   [{}] {} │ {:>16} │ {:<16} {}",
            tx.id,
            format_date(tx.start_date),
            amount_str,
            tx.category,
            repeat
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Income {}   Expenses {}",
        format_amount(filtered.total_income),
        format_amount(filtered.total_expenses)
    );

    Ok(())
}

/// Fields to change on an existing transaction; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct EditArgs {
    pub amount: Option<String>,
    pub category: Option<String>,
    pub is_income: Option<bool>,
    /// A recurrence name, or "none" to make the transaction one-off
    pub recurrence: Option<String>,
    pub date: Option<String>,
}

impl EditArgs {
    fn apply(&self, record: &mut NewTransaction) -> Result<()> {
        if let Some(amount) = &self.amount {
            record.amount =
                parse_amount(amount).with_context(|| format!("Invalid amount '{}'", amount))?;
        }
        if let Some(category) = &self.category {
            record.category = category.trim().to_string();
        }
        if let Some(is_income) = self.is_income {
            record.is_income = is_income;
        }
        if let Some(recurrence) = &self.recurrence {
            if recurrence.eq_ignore_ascii_case("none") {
                record.is_recurring = false;
                record.recurrence_type = None;
            } else {
                record.is_recurring = true;
                record.recurrence_type = Some(parse_recurrence(recurrence)?);
            }
        }
        if let Some(date) = &self.date {
            record.start_date = Some(local_day_start(parse_date(date)?)?);
        }
        Ok(())
    }
}

pub fn cmd_edit(db: &Database, config: &Config, id: i64, changes: &EditArgs) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", id))?;

    let mut record = tx.to_new();
    changes.apply(&mut record)?;

    Ledger::with_config(db, config)
        .update_transaction(id, &record)
        .context("Failed to update transaction")?;

    println!(
        "✅ Updated transaction #{}: {} {} on {}",
        id,
        format_amount(record.amount),
        record.category,
        format_date(record.start_date)
    );

    Ok(())
}

pub fn cmd_delete(db: &Database, config: &Config, id: i64) -> Result<()> {
    let deleted = Ledger::with_config(db, config)
        .delete_transaction(id)
        .with_context(|| format!("Failed to delete transaction {}", id))?;

    println!("🗑️  Deleted transaction #{}", id);
    if deleted.transactions > 1 {
        println!("   Also removed {} linked tax record(s)", deleted.transactions - 1);
    }
    if deleted.templates > 0 {
        println!("   Also removed {} recurring template(s)", deleted.templates);
    }

    Ok(())
}
