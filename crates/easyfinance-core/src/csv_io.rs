//! CSV backup format
//!
//! A file holds two sections, each introduced by a marker line and a
//! header row:
//!
//! ```text
//! === Transactions ===
//! id,amount,category,isIncome,isRecurring,recurrenceType,startDate
//! 1,10000,Sueldo,true,true,MONTHLY,01/05/2024
//!
//! === Recurring Templates ===
//! id,amount,category,isIncome,isRecurring,recurrenceType,startDate
//! 1,10000,Sueldo,true,true,MONTHLY,01/05/2024
//! ```
//!
//! Dates are local calendar days (`dd/MM/yyyy`). On import, ids are
//! ignored: a row updates the stored record with the same
//! (start_date, category, recurrence_type), otherwise it is inserted.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{MatchKey, NewTransaction, RecurrenceType};
use crate::reports::ReportFilter;
use crate::store::Store;

pub const TRANSACTIONS_MARKER: &str = "=== Transactions ===";
pub const TEMPLATES_MARKER: &str = "=== Recurring Templates ===";
pub const HEADER: [&str; 7] = [
    "id",
    "amount",
    "category",
    "isIncome",
    "isRecurring",
    "recurrenceType",
    "startDate",
];

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Per-section import counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionStats {
    pub inserted: usize,
    pub updated: usize,
    /// Malformed rows that were dropped
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub transactions: SectionStats,
    pub templates: SectionStats,
}

/// Rows written by an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub transactions: usize,
    pub templates: usize,
}

/// The seven exported fields of a record
struct Row<'a> {
    id: i64,
    amount: f64,
    category: &'a str,
    is_income: bool,
    is_recurring: bool,
    recurrence_type: Option<RecurrenceType>,
    start_date: Option<DateTime<Utc>>,
}

fn write_section<'a, W, Tz, I>(out: &mut W, marker: &str, rows: I, tz: &Tz) -> Result<usize>
where
    W: Write,
    Tz: TimeZone,
    I: IntoIterator<Item = Row<'a>>,
{
    writeln!(out, "{}", marker)?;

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(&mut *out);
    wtr.write_record(HEADER)?;

    let mut count = 0;
    for row in rows {
        let date = row
            .start_date
            .map(|d| d.with_timezone(tz).date_naive().format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        wtr.write_record([
            row.id.to_string(),
            row.amount.to_string(),
            row.category.to_string(),
            row.is_income.to_string(),
            row.is_recurring.to_string(),
            row.recurrence_type
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
            date,
        ])?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

/// Write every transaction and template as CSV
pub fn export_csv<S, W, Tz>(store: &S, mut out: W, tz: &Tz) -> Result<ExportStats>
where
    S: Store,
    W: Write,
    Tz: TimeZone,
{
    let transactions = store.list_transactions()?;
    let templates = store.list_templates()?;

    let tx_rows = transactions.iter().map(|t| Row {
        id: t.id,
        amount: t.amount,
        category: &t.category,
        is_income: t.is_income,
        is_recurring: t.is_recurring,
        recurrence_type: t.recurrence_type,
        start_date: t.start_date,
    });
    let written_transactions = write_section(&mut out, TRANSACTIONS_MARKER, tx_rows, tz)?;

    writeln!(out)?;

    let template_rows = templates.iter().map(|t| Row {
        id: t.id,
        amount: t.amount,
        category: &t.category,
        is_income: t.is_income,
        is_recurring: t.is_recurring,
        recurrence_type: t.recurrence_type,
        start_date: t.start_date,
    });
    let written_templates = write_section(&mut out, TEMPLATES_MARKER, template_rows, tz)?;
    out.flush()?;

    info!(
        "Exported {} transactions and {} templates",
        written_transactions, written_templates
    );
    Ok(ExportStats {
        transactions: written_transactions,
        templates: written_templates,
    })
}

/// Write the transactions accepted by `filter` as a single section
pub fn export_report_csv<S, W, Tz>(
    store: &S,
    filter: &ReportFilter,
    mut out: W,
    tz: &Tz,
) -> Result<usize>
where
    S: Store,
    W: Write,
    Tz: TimeZone,
{
    filter.validate()?;
    let transactions = store.list_transactions()?;

    let rows = transactions
        .iter()
        .filter(|t| filter.matches(t, tz))
        .map(|t| Row {
            id: t.id,
            amount: t.amount,
            category: &t.category,
            is_income: t.is_income,
            is_recurring: t.is_recurring,
            recurrence_type: t.recurrence_type,
            start_date: t.start_date,
        });
    let written = write_section(&mut out, TRANSACTIONS_MARKER, rows, tz)?;
    out.flush()?;

    info!("Exported report with {} transactions", written);
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Transactions,
    Templates,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse one data row; `None` for anything malformed
fn parse_row<Tz: TimeZone>(record: &StringRecord, tz: &Tz) -> Option<NewTransaction> {
    if record.len() < HEADER.len() {
        return None;
    }

    let amount: f64 = record[1].trim().parse().ok()?;
    if !amount.is_finite() {
        return None;
    }
    let category = record[2].trim();
    if category.is_empty() {
        return None;
    }
    let is_income = parse_bool(&record[3])?;
    let is_recurring = parse_bool(&record[4])?;

    let recurrence_type = match record[5].trim() {
        "" => None,
        value => Some(value.parse::<RecurrenceType>().ok()?),
    };
    let start_date = match record[6].trim() {
        "" => None,
        value => {
            let day = NaiveDate::parse_from_str(value, DATE_FORMAT).ok()?;
            let local = tz
                .from_local_datetime(&day.and_time(NaiveTime::MIN))
                .earliest()?;
            Some(local.with_timezone(&Utc))
        }
    };

    Some(NewTransaction {
        amount,
        category: category.to_string(),
        is_income,
        is_recurring,
        recurrence_type,
        start_date,
        paired_with: None,
    })
}

fn parse_line(line: &str) -> Option<StringRecord> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    rdr.records().next()?.ok()
}

/// Stored records by match key, consumed as rows update them
type Existing = HashMap<MatchKey, VecDeque<(i64, Option<i64>)>>;

fn index_existing<I>(records: I) -> Existing
where
    I: IntoIterator<Item = (MatchKey, i64, Option<i64>)>,
{
    let mut index = Existing::new();
    for (key, id, paired_with) in records {
        index.entry(key).or_default().push_back((id, paired_with));
    }
    index
}

/// Import a CSV backup into `store`
///
/// Malformed rows are skipped and counted. Each stored record is updated
/// at most once, so a file with several identical rows inserts the extra
/// ones instead of collapsing them.
pub fn import_csv<S, R, Tz>(store: &S, mut input: R, tz: &Tz) -> Result<ImportStats>
where
    S: Store,
    R: Read,
    Tz: TimeZone,
{
    let mut content = String::new();
    input.read_to_string(&mut content)?;

    let mut existing_transactions = index_existing(store.list_transactions()?.into_iter().map(
        |t| {
            (
                MatchKey::new(t.category, t.start_date, t.recurrence_type),
                t.id,
                t.paired_with,
            )
        },
    ));
    let mut existing_templates = index_existing(store.list_templates()?.into_iter().map(|t| {
        (
            MatchKey::new(t.category, t.start_date, t.recurrence_type),
            t.id,
            t.paired_with,
        )
    }));

    let mut stats = ImportStats::default();
    let mut section = Section::None;

    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed == TRANSACTIONS_MARKER {
            section = Section::Transactions;
            continue;
        }
        if trimmed == TEMPLATES_MARKER {
            section = Section::Templates;
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("id,amount") {
            continue;
        }

        let (section_stats, existing) = match section {
            Section::Transactions => (&mut stats.transactions, &mut existing_transactions),
            Section::Templates => (&mut stats.templates, &mut existing_templates),
            Section::None => {
                debug!("Line {}: outside any section, ignored", line_no + 1);
                continue;
            }
        };

        let Some(mut record) = parse_line(line).and_then(|r| parse_row(&r, tz)) else {
            debug!("Line {}: malformed row skipped", line_no + 1);
            section_stats.skipped += 1;
            continue;
        };

        let key = MatchKey::of(&record);
        match existing.get_mut(&key).and_then(|ids| ids.pop_front()) {
            Some((id, paired_with)) => {
                record.paired_with = paired_with;
                match section {
                    Section::Transactions => store.update_transaction(id, &record)?,
                    _ => store.update_template(id, &record)?,
                }
                section_stats.updated += 1;
            }
            None => {
                match section {
                    Section::Transactions => store.insert_transaction(&record)?,
                    _ => store.insert_template(&record)?,
                };
                section_stats.inserted += 1;
            }
        }
    }

    info!(
        "Imported transactions ({} new, {} updated, {} skipped) and templates ({} new, {} updated, {} skipped)",
        stats.transactions.inserted,
        stats.transactions.updated,
        stats.transactions.skipped,
        stats.templates.inserted,
        stats.templates.updated,
        stats.templates.skipped
    );
    Ok(stats)
}
