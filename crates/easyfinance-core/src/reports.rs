//! Aggregate views over transactions
//!
//! All date comparisons happen in the caller's time zone: a transaction
//! belongs to the local calendar day its timestamp falls on.

use std::collections::BTreeMap;

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Length of a fortnight window in days
pub const FORTNIGHT_DAYS: i64 = 15;

fn local_naive<Tz: TimeZone>(date: &DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    date.with_timezone(tz).naive_local()
}

fn start_of(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// Last representable instant of a local day
fn end_of(day: NaiveDate) -> NaiveDateTime {
    start_of(day) + Duration::days(1) - Duration::milliseconds(1)
}

/// Income, expenses and balance
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    /// Transactions that entered the totals
    pub transaction_count: usize,
}

impl Summary {
    fn add(&mut self, tx: &Transaction) {
        if tx.is_income {
            self.total_income += tx.amount;
        } else {
            self.total_expenses += tx.amount;
        }
        self.balance = self.total_income - self.total_expenses;
        self.transaction_count += 1;
    }
}

/// Totals over transactions dated up to the end of today
///
/// Undated and future-dated transactions are left out.
pub fn summarize<Tz: TimeZone>(transactions: &[Transaction], now: &DateTime<Tz>) -> Summary {
    let tz = now.timezone();
    let end_of_today = end_of(now.date_naive());

    let mut summary = Summary::default();
    for tx in transactions {
        match &tx.start_date {
            Some(date) if local_naive(date, &tz) <= end_of_today => summary.add(tx),
            _ => {}
        }
    }
    summary
}

/// Totals per category, split by direction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub income: BTreeMap<String, f64>,
    pub expenses: BTreeMap<String, f64>,
}

pub fn category_totals(transactions: &[Transaction]) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for tx in transactions {
        let bucket = if tx.is_income {
            &mut totals.income
        } else {
            &mut totals.expenses
        };
        *bucket.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
    }
    totals
}

/// One fortnight window `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fortnight {
    /// Start day as `dd/MM`
    pub label: String,
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
    pub current: bool,
    pub income: f64,
    pub expenses: f64,
}

/// First day of the fortnight containing `day`: the 1st or the 16th
pub fn fortnight_start(day: NaiveDate) -> NaiveDate {
    let first = if day.day() <= 15 { 1 } else { 16 };
    day.with_day(first).unwrap_or(day)
}

/// Previous, current and next fortnight around `today`
///
/// Neighbouring windows are 15 days before and after the current one, so
/// they do not always line up with the 1st/16th of other months.
pub fn fortnight_totals<Tz: TimeZone>(
    transactions: &[Transaction],
    today: &DateTime<Tz>,
) -> Vec<Fortnight> {
    let tz = today.timezone();
    let current = fortnight_start(today.date_naive());

    [-FORTNIGHT_DAYS, 0, FORTNIGHT_DAYS]
        .into_iter()
        .map(|offset| {
            let start = current + Duration::days(offset);
            let end = start + Duration::days(FORTNIGHT_DAYS);
            let (from, to) = (start_of(start), start_of(end));

            let mut window = Fortnight {
                label: start.format("%d/%m").to_string(),
                start,
                end,
                current: offset == 0,
                income: 0.0,
                expenses: 0.0,
            };
            for tx in transactions {
                let Some(date) = &tx.start_date else { continue };
                let local = local_naive(date, &tz);
                if local >= from && local < to {
                    if tx.is_income {
                        window.income += tx.amount;
                    } else {
                        window.expenses += tx.amount;
                    }
                }
            }
            window
        })
        .collect()
}

/// Direction filter for the transaction list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindFilter {
    #[default]
    All,
    Income,
    Expense,
}

/// Date filter for the transaction list; ranges end today (inclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    All,
    /// From midnight seven days ago
    LastWeek,
    /// From midnight on the same day last month
    LastMonth,
    /// Inclusive on both ends
    Custom { from: NaiveDate, to: NaiveDate },
}

impl DateRange {
    fn bounds(&self, today: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match *self {
            Self::All => None,
            Self::LastWeek => Some((
                start_of(today - Duration::days(7)),
                end_of(today),
            )),
            Self::LastMonth => {
                let from = today
                    .checked_sub_months(Months::new(1))
                    .unwrap_or(today - Duration::days(30));
                Some((start_of(from), end_of(today)))
            }
            Self::Custom { from, to } => Some((start_of(from), end_of(to))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: KindFilter,
    pub range: DateRange,
    /// `None` = every category
    pub category: Option<String>,
}

/// Transactions kept by a filter and their totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filtered {
    pub transactions: Vec<Transaction>,
    pub total_income: f64,
    pub total_expenses: f64,
}

impl TransactionFilter {
    pub fn apply<Tz: TimeZone>(
        &self,
        transactions: &[Transaction],
        now: &DateTime<Tz>,
    ) -> Filtered {
        let tz = now.timezone();
        let bounds = self.range.bounds(now.date_naive());

        let mut filtered = Filtered::default();
        for tx in transactions {
            let kind_ok = match self.kind {
                KindFilter::All => true,
                KindFilter::Income => tx.is_income,
                KindFilter::Expense => !tx.is_income,
            };
            let date_ok = match (bounds, &tx.start_date) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some((from, to)), Some(date)) => {
                    let local = local_naive(date, &tz);
                    local >= from && local <= to
                }
            };
            let category_ok = self
                .category
                .as_deref()
                .map_or(true, |c| c == tx.category);

            if kind_ok && date_ok && category_ok {
                if tx.is_income {
                    filtered.total_income += tx.amount;
                } else {
                    filtered.total_expenses += tx.amount;
                }
                filtered.transactions.push(tx.clone());
            }
        }
        filtered
    }
}

/// Selection for the filtered report export
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFilter {
    pub category: Option<String>,
    /// First included day
    pub start: Option<NaiveDate>,
    /// Last included day
    pub end: Option<NaiveDate>,
    pub show_incomes: bool,
    pub show_expenses: bool,
    pub show_recurring: bool,
    pub show_non_recurring: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            category: None,
            start: None,
            end: None,
            show_incomes: true,
            show_expenses: true,
            show_recurring: true,
            show_non_recurring: true,
        }
    }
}

impl ReportFilter {
    /// Reject filters that can never match anything
    pub fn validate(&self) -> Result<()> {
        if !self.show_incomes && !self.show_expenses {
            return Err(Error::InvalidData(
                "report must include incomes, expenses or both".into(),
            ));
        }
        if !self.show_recurring && !self.show_non_recurring {
            return Err(Error::InvalidData(
                "report must include recurring, non-recurring or both".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(Error::InvalidData(format!(
                    "start date {} is after end date {}",
                    start.format("%d/%m/%Y"),
                    end.format("%d/%m/%Y")
                )));
            }
        }
        Ok(())
    }

    /// Whether `tx` belongs in the report; dates are read in `tz`
    pub fn matches<Tz: TimeZone>(&self, tx: &Transaction, tz: &Tz) -> bool {
        let kind_shown = if tx.is_income {
            self.show_incomes
        } else {
            self.show_expenses
        };
        let recurrence_shown = if tx.is_recurring {
            self.show_recurring
        } else {
            self.show_non_recurring
        };
        if !kind_shown || !recurrence_shown {
            return false;
        }
        if let Some(category) = &self.category {
            if *category != tx.category {
                return false;
            }
        }
        if self.start.is_none() && self.end.is_none() {
            return true;
        }

        let Some(date) = &tx.start_date else {
            return false;
        };
        let local = local_naive(date, tz);
        self.start.map_or(true, |s| local >= start_of(s))
            && self.end.map_or(true, |e| local <= end_of(e))
    }
}
