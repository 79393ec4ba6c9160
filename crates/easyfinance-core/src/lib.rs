//! EasyFinance Core Library
//!
//! Shared functionality for the EasyFinance personal finance tracker:
//! - Domain models for transactions and recurring templates
//! - Recurrence calculator (fixed-interval period boundaries)
//! - Payroll tax estimator for salary income
//! - Storage backends (SQLite and an in-memory document store)
//! - Recurring generator that materializes due occurrences
//! - Ledger operations with salary/tax pairing and cascading deletes
//! - Balance, category and fortnight reports
//! - Two-section CSV export/import

pub mod config;
pub mod csv_io;
pub mod db;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod models;
pub mod recurrence;
pub mod reports;
pub mod store;
pub mod tax;

pub use config::Config;
pub use csv_io::{
    export_csv, export_report_csv, import_csv, ExportStats, ImportStats, SectionStats,
};
pub use db::Database;
pub use error::{Error, Result};
pub use generator::{BackfillPolicy, GeneratedOccurrence, GenerationReport, RecurringGenerator};
pub use ledger::{parse_amount, Deleted, Ledger, Recorded};
pub use models::{NewTemplate, NewTransaction, RecurrenceType, RecurringTemplate, Transaction};
pub use recurrence::{due_occurrence, DAY_MS};
pub use reports::{
    category_totals, fortnight_totals, summarize, CategoryTotals, DateRange, Fortnight, KindFilter,
    ReportFilter, Summary, TransactionFilter,
};
pub use store::{MemoryStore, Store};
pub use tax::{TaxBracket, TaxBreakdown, TaxTable};
