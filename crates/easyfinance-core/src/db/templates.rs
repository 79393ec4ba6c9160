//! Recurring template operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_recurrence, parse_start_date, to_millis, Database, RECORD_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{MatchKey, NewTemplate, RecurringTemplate};

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<RecurringTemplate> {
    Ok(RecurringTemplate {
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
    /// Insert a recurring template, returning its new ID
    pub fn insert_template(&self, template: &NewTemplate) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO recurring_templates (amount, category, is_income, is_recurring, recurrence_type, start_date, paired_with)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                template.amount,
                template.category,
                template.is_income,
                template.is_recurring,
                template.recurrence_type.map(|r| r.as_str()),
                to_millis(template.start_date),
                template.paired_with,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Replace every field of an existing template
    pub fn update_template(&self, id: i64, template: &NewTemplate) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            r#"
            UPDATE recurring_templates
            SET amount = ?, category = ?, is_income = ?, is_recurring = ?,
                recurrence_type = ?, start_date = ?, paired_with = ?
            WHERE id = ?
            "#,
            params![
                template.amount,
                template.category,
                template.is_income,
                template.is_recurring,
                template.recurrence_type.map(|r| r.as_str()),
                to_millis(template.start_date),
                template.paired_with,
                id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("template {}", id)));
        }
        Ok(())
    }

    /// Delete a template, returning whether it existed
    ///
    /// Transactions already generated from it are kept.
    pub fn delete_template(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM recurring_templates WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    pub fn get_template(&self, id: i64) -> Result<Option<RecurringTemplate>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM recurring_templates WHERE id = ?",
            RECORD_COLUMNS
        );
        let template = conn
            .query_row(&sql, params![id], row_to_template)
            .optional()?;
        Ok(template)
    }

    pub fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        self.query_templates("ORDER BY id", [])
    }

    /// Templates the generator should evaluate
    pub fn list_recurring_templates(&self) -> Result<Vec<RecurringTemplate>> {
        self.query_templates("WHERE is_recurring = 1 ORDER BY id", [])
    }

    pub fn find_templates(&self, key: &MatchKey) -> Result<Vec<RecurringTemplate>> {
        self.query_templates(
            "WHERE category = ? AND start_date IS ? AND recurrence_type IS ? ORDER BY id",
            params![
                key.category,
                to_millis(key.start_date),
                key.recurrence_type.map(|r| r.as_str()),
            ],
        )
    }

    pub fn find_paired_templates(&self, parent_id: i64) -> Result<Vec<RecurringTemplate>> {
        self.query_templates("WHERE paired_with = ? ORDER BY id", params![parent_id])
    }

    fn query_templates<P: rusqlite::Params>(
        &self,
        clause: &str,
        params: P,
    ) -> Result<Vec<RecurringTemplate>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM recurring_templates {}",
            RECORD_COLUMNS, clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, row_to_template)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}
