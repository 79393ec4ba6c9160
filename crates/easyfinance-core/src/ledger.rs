//! Recording and removing transactions and templates
//!
//! A salary income owns a withholding expense with the same date and
//! recurrence. The ledger creates that expense alongside the salary, keeps
//! it in step on edits and removes it with the salary. Pairs created here
//! carry an explicit `paired_with` link; rows without one (imports, older
//! data) are found by (tax category, start_date, recurrence_type).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Categories, Config};
use crate::error::{Error, Result};
use crate::models::{MatchKey, NewTemplate, NewTransaction, RecurrenceType};
use crate::store::Store;
use crate::tax::{TaxBreakdown, TaxTable};

/// Ids of everything a record call stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recorded {
    pub transaction_id: Option<i64>,
    pub template_id: Option<i64>,
    pub tax_transaction_id: Option<i64>,
    pub tax_template_id: Option<i64>,
}

/// Number of rows removed by a delete, cascades included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub transactions: usize,
    pub templates: usize,
}

/// Parse a user-entered amount; thousands separators are ignored
pub fn parse_amount(input: &str) -> Result<f64> {
    let cleaned = input.trim().replace(',', "");
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| Error::InvalidData(format!("'{}' is not a valid amount", input)))?;
    if !amount.is_finite() {
        return Err(Error::InvalidData(format!("'{}' is not a valid amount", input)));
    }
    Ok(amount)
}

pub struct Ledger<'a, S: Store> {
    store: &'a S,
    categories: Categories,
    tax: TaxTable,
}

impl<'a, S: Store> Ledger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            categories: Categories::default(),
            tax: TaxTable::default(),
        }
    }

    pub fn with_config(store: &'a S, config: &Config) -> Self {
        Self {
            store,
            categories: config.categories.clone(),
            tax: config.tax.clone(),
        }
    }

    /// Check a payload before it is stored
    pub fn validate(&self, record: &NewTransaction) -> Result<()> {
        if !record.amount.is_finite() {
            return Err(Error::InvalidData("amount must be a finite number".into()));
        }
        if record.amount < 0.0 {
            return Err(Error::InvalidData(
                "amount must not be negative; use the income/expense flag".into(),
            ));
        }
        if record.category.trim().is_empty() {
            return Err(Error::InvalidData("category is required".into()));
        }
        if record.is_recurring && (record.recurrence_type.is_none() || record.start_date.is_none())
        {
            return Err(Error::InvalidData(
                "recurring records need a recurrence type and a start date".into(),
            ));
        }
        Ok(())
    }

    /// Withholding for a salary payload
    pub fn tax_for(&self, record: &NewTransaction) -> TaxBreakdown {
        self.tax.estimate(record.amount, record.recurrence_type)
    }

    fn is_salary(&self, record: &NewTransaction) -> bool {
        record.is_salary(&self.categories.salary)
    }

    fn tax_record(&self, salary: &NewTransaction, parent_id: i64) -> NewTransaction {
        NewTransaction {
            amount: self.tax_for(salary).total,
            category: self.categories.tax.clone(),
            is_income: false,
            is_recurring: salary.is_recurring,
            recurrence_type: salary.recurrence_type,
            start_date: salary.start_date,
            paired_with: Some(parent_id),
        }
    }

    /// Recurrence only applies to recurring records
    fn normalize(record: &NewTransaction) -> NewTransaction {
        let mut record = record.clone();
        if !record.is_recurring {
            record.recurrence_type = None;
        }
        record
    }

    /// Store a transaction
    ///
    /// A recurring transaction also stores its template, and a salary also
    /// stores its tax expense (plus a tax template when recurring).
    pub fn record_transaction(&self, record: &NewTransaction) -> Result<Recorded> {
        self.validate(record)?;
        let record = Self::normalize(record);
        let mut recorded = Recorded::default();

        let tx_id = self.store.insert_transaction(&record)?;
        recorded.transaction_id = Some(tx_id);
        info!("Recorded {} transaction {}", record.category, tx_id);

        if self.is_salary(&record) {
            let tax = self.tax_record(&record, tx_id);
            recorded.tax_transaction_id = Some(self.store.insert_transaction(&tax)?);
            debug!("Paired tax transaction of {:.2}", tax.amount);
        }

        if record.is_recurring {
            let template_id = self.store.insert_template(&record)?;
            recorded.template_id = Some(template_id);

            if self.is_salary(&record) {
                let tax = self.tax_record(&record, template_id);
                recorded.tax_template_id = Some(self.store.insert_template(&tax)?);
            }
        }

        Ok(recorded)
    }

    /// Store a template; a salary template also stores its tax template
    pub fn record_template(&self, record: &NewTemplate) -> Result<Recorded> {
        self.validate(record)?;
        let record = Self::normalize(record);
        let mut recorded = Recorded::default();

        let template_id = self.store.insert_template(&record)?;
        recorded.template_id = Some(template_id);
        info!("Recorded {} template {}", record.category, template_id);

        if self.is_salary(&record) {
            let tax = self.tax_record(&record, template_id);
            recorded.tax_template_id = Some(self.store.insert_template(&tax)?);
        }

        Ok(recorded)
    }

    /// Replace a transaction
    ///
    /// Everything the record owns follows the edit:
    /// - a salary's tax transactions are recomputed, or created when the
    ///   record only now became a salary
    /// - tax transactions of a record that stopped being a salary are removed
    /// - a record that becomes recurring gets its template (and tax template)
    ///   unless a matching one exists; one that stops recurring loses its
    ///   matching templates
    pub fn update_transaction(&self, id: i64, record: &NewTransaction) -> Result<()> {
        self.validate(record)?;
        let record = Self::normalize(record);
        let old = self
            .store
            .get_transaction(id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?
            .to_new();
        let was_salary = self.is_salary(&old);

        let mut tax_ids: BTreeSet<i64> = self
            .store
            .find_paired_transactions(id)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if was_salary && old.start_date.is_some() {
            let key = self.tax_key(old.start_date, old.recurrence_type);
            tax_ids.extend(self.store.find_transactions(&key)?.into_iter().map(|t| t.id));
        }

        self.store.update_transaction(id, &record)?;

        if self.is_salary(&record) {
            let tax = self.tax_record(&record, id);
            if tax_ids.is_empty() {
                let tax_id = self.store.insert_transaction(&tax)?;
                debug!("Transaction {} became a salary, paired tax {}", id, tax_id);
            }
            for tax_id in tax_ids {
                self.store.update_transaction(tax_id, &tax)?;
            }
        } else {
            for tax_id in tax_ids {
                self.store.delete_transaction(tax_id)?;
                debug!("Removed tax transaction {} of former salary {}", tax_id, id);
            }
        }

        self.sync_templates(&old, &record, was_salary)
    }

    /// Keep the templates owned by a recurring transaction in step with it
    fn sync_templates(
        &self,
        old: &NewTransaction,
        record: &NewTransaction,
        was_salary: bool,
    ) -> Result<()> {
        let owned = if old.is_recurring {
            self.store.find_templates(&MatchKey::of(old))?
        } else {
            Vec::new()
        };

        if !record.is_recurring {
            for template in owned {
                self.delete_template_cascade(
                    template.id,
                    was_salary,
                    template.start_date,
                    template.recurrence_type,
                )?;
            }
            return Ok(());
        }

        if owned.is_empty() {
            if self.store.find_templates(&MatchKey::of(record))?.is_empty() {
                let template = NewTransaction {
                    paired_with: None,
                    ..record.clone()
                };
                self.record_template(&template)?;
            }
            return Ok(());
        }

        for template in owned {
            let updated = NewTransaction {
                paired_with: template.paired_with,
                ..record.clone()
            };
            self.update_template(template.id, &updated)?;
        }
        Ok(())
    }

    /// Replace a template; its tax templates follow the salary status like
    /// a transaction's tax rows do
    pub fn update_template(&self, id: i64, record: &NewTemplate) -> Result<()> {
        self.validate(record)?;
        let record = Self::normalize(record);
        let old = self
            .store
            .get_template(id)?
            .ok_or_else(|| Error::NotFound(format!("template {}", id)))?
            .to_new();

        let mut tax_ids: BTreeSet<i64> = self
            .store
            .find_paired_templates(id)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if self.is_salary(&old) && old.start_date.is_some() {
            let key = self.tax_key(old.start_date, old.recurrence_type);
            tax_ids.extend(self.store.find_templates(&key)?.into_iter().map(|t| t.id));
        }

        self.store.update_template(id, &record)?;

        if self.is_salary(&record) {
            let tax = self.tax_record(&record, id);
            if tax_ids.is_empty() {
                let tax_id = self.store.insert_template(&tax)?;
                debug!("Template {} became a salary, paired tax template {}", id, tax_id);
            }
            for tax_id in tax_ids {
                self.store.update_template(tax_id, &tax)?;
            }
        } else {
            for tax_id in tax_ids {
                self.store.delete_template(tax_id)?;
            }
        }
        Ok(())
    }

    /// Delete a transaction with everything that belongs to it
    ///
    /// - a salary's tax transactions
    /// - for a recurring transaction, the templates with the same
    ///   (category, start_date, recurrence_type), and for a salary their
    ///   tax templates
    pub fn delete_transaction(&self, id: i64) -> Result<Deleted> {
        let tx = self
            .store
            .get_transaction(id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;
        let mut deleted = Deleted::default();

        if self.store.delete_transaction(id)? {
            deleted.transactions += 1;
        }

        let is_salary = tx.is_salary(&self.categories.salary);
        if is_salary && tx.start_date.is_some() {
            let key = self.tax_key(tx.start_date, tx.recurrence_type);
            let ids: BTreeSet<i64> = self
                .store
                .find_paired_transactions(id)?
                .into_iter()
                .chain(self.store.find_transactions(&key)?)
                .map(|t| t.id)
                .collect();
            for tax_id in ids {
                if self.store.delete_transaction(tax_id)? {
                    deleted.transactions += 1;
                }
            }
        }

        if tx.is_recurring {
            let key = MatchKey::new(tx.category.clone(), tx.start_date, tx.recurrence_type);
            for template in self.store.find_templates(&key)? {
                deleted.templates += self.delete_template_cascade(
                    template.id,
                    is_salary,
                    template.start_date,
                    template.recurrence_type,
                )?;
            }
        }

        info!(
            "Deleted transaction {} ({} transactions, {} templates removed)",
            id, deleted.transactions, deleted.templates
        );
        Ok(deleted)
    }

    /// Delete a template and, for a salary, its tax templates
    ///
    /// Occurrences already generated stay in place.
    pub fn delete_template(&self, id: i64) -> Result<Deleted> {
        let template = self
            .store
            .get_template(id)?
            .ok_or_else(|| Error::NotFound(format!("template {}", id)))?;

        let templates = self.delete_template_cascade(
            id,
            template.is_salary(&self.categories.salary),
            template.start_date,
            template.recurrence_type,
        )?;

        info!("Deleted template {} ({} templates removed)", id, templates);
        Ok(Deleted {
            transactions: 0,
            templates,
        })
    }

    fn delete_template_cascade(
        &self,
        id: i64,
        is_salary: bool,
        start_date: Option<DateTime<Utc>>,
        recurrence_type: Option<RecurrenceType>,
    ) -> Result<usize> {
        let mut count = 0;
        if self.store.delete_template(id)? {
            count += 1;
        }

        if is_salary && start_date.is_some() {
            let key = self.tax_key(start_date, recurrence_type);
            let ids: BTreeSet<i64> = self
                .store
                .find_paired_templates(id)?
                .into_iter()
                .chain(self.store.find_templates(&key)?)
                .map(|t| t.id)
                .collect();
            for tax_id in ids {
                if self.store.delete_template(tax_id)? {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn tax_key(
        &self,
        start_date: Option<DateTime<Utc>>,
        recurrence_type: Option<RecurrenceType>,
    ) -> MatchKey {
        MatchKey::new(self.categories.tax.clone(), start_date, recurrence_type)
    }
}
