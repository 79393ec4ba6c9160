//! Transaction operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_recurrence, parse_start_date, to_millis, Database, RECORD_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{MatchKey, NewTransaction, Transaction};

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        is_income: row.get(3)?,
        is_recurring: row.get(4)?,
        recurrence_type: parse_recurrence(row.get(5)?),
        start_date: parse_start_date(row.get(6)?),
        paired_with: row.get(7)?,
    })
}

impl Database {
    /// Insert a transaction, returning its new ID
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (amount, category, is_income, is_recurring, recurrence_type, start_date, paired_with)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.amount,
                tx.category,
                tx.is_income,
                tx.is_recurring,
                tx.recurrence_type.map(|r| r.as_str()),
                to_millis(tx.start_date),
                tx.paired_with,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Replace every field of an existing transaction
    pub fn update_transaction(&self, id: i64, tx: &NewTransaction) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET amount = ?, category = ?, is_income = ?, is_recurring = ?,
                recurrence_type = ?, start_date = ?, paired_with = ?
            WHERE id = ?
            "#,
            params![
                tx.amount,
                tx.category,
                tx.is_income,
                tx.is_recurring,
                tx.recurrence_type.map(|r| r.as_str()),
                to_millis(tx.start_date),
                tx.paired_with,
                id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    /// Delete a transaction, returning whether it existed
    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", RECORD_COLUMNS);
        let tx = conn
            .query_row(&sql, params![id], row_to_transaction)
            .optional()?;
        Ok(tx)
    }

    /// List all transactions, newest first (undated last)
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions ORDER BY start_date IS NULL, start_date DESC, id DESC",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_transaction)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Transactions matching (category, start_date, recurrence_type)
    ///
    /// `IS` is SQLite's null-safe equality, so a key without a date or
    /// recurrence only matches rows that also lack them.
    pub fn find_transactions(&self, key: &MatchKey) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE category = ? AND start_date IS ? AND recurrence_type IS ? ORDER BY id",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                key.category,
                to_millis(key.start_date),
                key.recurrence_type.map(|r| r.as_str()),
            ],
            row_to_transaction,
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Whether an occurrence with this key was already recorded
    pub fn transaction_exists(&self, key: &MatchKey) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM transactions
                WHERE category = ? AND start_date IS ? AND recurrence_type IS ?
            )
            "#,
            params![
                key.category,
                to_millis(key.start_date),
                key.recurrence_type.map(|r| r.as_str()),
            ],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Transactions explicitly paired with `parent_id`
    pub fn find_paired_transactions(&self, parent_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE paired_with = ? ORDER BY id",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![parent_id], row_to_transaction)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Count of stored transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }
}
