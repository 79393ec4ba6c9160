//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction CRUD and duplicate lookups
//! - `templates` - Recurring template CRUD

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{
    from_millis, MatchKey, NewTemplate, NewTransaction, RecurrenceType, RecurringTemplate,
    Transaction,
};
use crate::store::Store;

mod templates;
mod transactions;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable overriding the default database path
pub const DB_PATH_ENV: &str = "EASYFINANCE_DB";

/// Default database file, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "easyfinance.db";

/// Columns shared by both record tables, in row-mapping order
pub(crate) const RECORD_COLUMNS: &str =
    "id, amount, category, is_income, is_recurring, recurrence_type, start_date, paired_with";

/// Storage form of a timestamp: epoch milliseconds
pub(crate) fn to_millis(date: Option<DateTime<Utc>>) -> Option<i64> {
    date.map(|d| d.timestamp_millis())
}

pub(crate) fn parse_recurrence(value: Option<String>) -> Option<RecurrenceType> {
    let value = value?;
    match value.parse() {
        Ok(recurrence) => Some(recurrence),
        Err(_) => {
            warn!("Ignoring unknown recurrence type in database: {}", value);
            None
        }
    }
}

pub(crate) fn parse_start_date(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(from_millis)
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "easyfinance_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any leftover file from an earlier run
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Delete every transaction and template
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            DELETE FROM transactions;
            DELETE FROM recurring_templates;
            "#,
        )?;
        info!("Database reset complete");
        Ok(())
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the scheduled generator
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Transactions (user-entered and generated occurrences)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                is_income BOOLEAN NOT NULL,
                is_recurring BOOLEAN NOT NULL DEFAULT 0,
                recurrence_type TEXT,                      -- WEEKLY, BIWEEKLY, MONTHLY
                start_date INTEGER,                        -- epoch milliseconds (UTC)
                paired_with INTEGER,                       -- salary transaction a tax row belongs to
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_match
                ON transactions(category, start_date, recurrence_type);
            CREATE INDEX IF NOT EXISTS idx_transactions_paired ON transactions(paired_with);

            -- Recurring templates (rules the generator materializes)
            CREATE TABLE IF NOT EXISTS recurring_templates (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                is_income BOOLEAN NOT NULL,
                is_recurring BOOLEAN NOT NULL DEFAULT 1,
                recurrence_type TEXT,
                start_date INTEGER,
                paired_with INTEGER,                       -- salary template a tax template belongs to
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_templates_match
                ON recurring_templates(category, start_date, recurrence_type);
            CREATE INDEX IF NOT EXISTS idx_templates_paired ON recurring_templates(paired_with);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

impl Store for Database {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        Database::insert_transaction(self, tx)
    }

    fn update_transaction(&self, id: i64, tx: &NewTransaction) -> Result<()> {
        Database::update_transaction(self, id, tx)
    }

    fn delete_transaction(&self, id: i64) -> Result<bool> {
        Database::delete_transaction(self, id)
    }

    fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        Database::get_transaction(self, id)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>> {
        Database::list_transactions(self)
    }

    fn find_transactions(&self, key: &MatchKey) -> Result<Vec<Transaction>> {
        Database::find_transactions(self, key)
    }

    fn find_paired_transactions(&self, parent_id: i64) -> Result<Vec<Transaction>> {
        Database::find_paired_transactions(self, parent_id)
    }

    fn transaction_exists(&self, key: &MatchKey) -> Result<bool> {
        Database::transaction_exists(self, key)
    }

    fn insert_template(&self, template: &NewTemplate) -> Result<i64> {
        Database::insert_template(self, template)
    }

    fn update_template(&self, id: i64, template: &NewTemplate) -> Result<()> {
        Database::update_template(self, id, template)
    }

    fn delete_template(&self, id: i64) -> Result<bool> {
        Database::delete_template(self, id)
    }

    fn get_template(&self, id: i64) -> Result<Option<RecurringTemplate>> {
        Database::get_template(self, id)
    }

    fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        Database::list_templates(self)
    }

    fn find_templates(&self, key: &MatchKey) -> Result<Vec<RecurringTemplate>> {
        Database::find_templates(self, key)
    }

    fn find_paired_templates(&self, parent_id: i64) -> Result<Vec<RecurringTemplate>> {
        Database::find_paired_templates(self, parent_id)
    }

    fn list_recurring_templates(&self) -> Result<Vec<RecurringTemplate>> {
        Database::list_recurring_templates(self)
    }
}
