//! Storage abstraction shared by the SQLite database and the in-memory
//! document store
//!
//! The ledger, the recurring generator and CSV import only talk to
//! [`Store`], so they behave the same on either backend.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::models::{MatchKey, NewTemplate, NewTransaction, RecurringTemplate, Transaction};

/// CRUD over transactions and recurring templates
pub trait Store {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64>;
    fn update_transaction(&self, id: i64, tx: &NewTransaction) -> Result<()>;
    /// Returns false when no transaction had this id
    fn delete_transaction(&self, id: i64) -> Result<bool>;
    fn get_transaction(&self, id: i64) -> Result<Option<Transaction>>;
    fn list_transactions(&self) -> Result<Vec<Transaction>>;
    /// Transactions whose (category, start_date, recurrence_type) equal `key`
    fn find_transactions(&self, key: &MatchKey) -> Result<Vec<Transaction>>;
    /// Transactions that reference `parent_id` through `paired_with`
    fn find_paired_transactions(&self, parent_id: i64) -> Result<Vec<Transaction>>;

    fn insert_template(&self, template: &NewTemplate) -> Result<i64>;
    fn update_template(&self, id: i64, template: &NewTemplate) -> Result<()>;
    fn delete_template(&self, id: i64) -> Result<bool>;
    fn get_template(&self, id: i64) -> Result<Option<RecurringTemplate>>;
    fn list_templates(&self) -> Result<Vec<RecurringTemplate>>;
    fn find_templates(&self, key: &MatchKey) -> Result<Vec<RecurringTemplate>>;
    fn find_paired_templates(&self, parent_id: i64) -> Result<Vec<RecurringTemplate>>;

    fn transaction_exists(&self, key: &MatchKey) -> Result<bool> {
        Ok(!self.find_transactions(key)?.is_empty())
    }

    /// Templates flagged as recurring; the generator only looks at these
    fn list_recurring_templates(&self) -> Result<Vec<RecurringTemplate>> {
        Ok(self
            .list_templates()?
            .into_iter()
            .filter(|t| t.is_recurring)
            .collect())
    }
}

#[derive(Debug, Default)]
struct Documents {
    next_id: i64,
    transactions: BTreeMap<i64, Transaction>,
    templates: BTreeMap<i64, RecurringTemplate>,
}

impl Documents {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local document store, one collection per record kind
///
/// Stands in for the remote per-user document collections: records are
/// whole documents keyed by id, queries are equality filters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> MutexGuard<'_, Documents> {
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn transaction_from(id: i64, tx: &NewTransaction) -> Transaction {
    Transaction {
        id,
        amount: tx.amount,
        category: tx.category.clone(),
        is_income: tx.is_income,
        is_recurring: tx.is_recurring,
        recurrence_type: tx.recurrence_type,
        start_date: tx.start_date,
        paired_with: tx.paired_with,
    }
}

fn template_from(id: i64, t: &NewTemplate) -> RecurringTemplate {
    RecurringTemplate {
        id,
        amount: t.amount,
        category: t.category.clone(),
        is_income: t.is_income,
        is_recurring: t.is_recurring,
        recurrence_type: t.recurrence_type,
        start_date: t.start_date,
        paired_with: t.paired_with,
    }
}

impl Store for MemoryStore {
    fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let mut docs = self.docs();
        let id = docs.allocate_id();
        docs.transactions.insert(id, transaction_from(id, tx));
        Ok(id)
    }

    fn update_transaction(&self, id: i64, tx: &NewTransaction) -> Result<()> {
        let mut docs = self.docs();
        match docs.transactions.get_mut(&id) {
            Some(existing) => {
                *existing = transaction_from(id, tx);
                Ok(())
            }
            None => Err(Error::NotFound(format!("transaction {}", id))),
        }
    }

    fn delete_transaction(&self, id: i64) -> Result<bool> {
        Ok(self.docs().transactions.remove(&id).is_some())
    }

    fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self.docs().transactions.get(&id).cloned())
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.docs().transactions.values().cloned().collect())
    }

    fn find_transactions(&self, key: &MatchKey) -> Result<Vec<Transaction>> {
        Ok(self
            .docs()
            .transactions
            .values()
            .filter(|t| key.matches(&t.category, t.start_date, t.recurrence_type))
            .cloned()
            .collect())
    }

    fn find_paired_transactions(&self, parent_id: i64) -> Result<Vec<Transaction>> {
        Ok(self
            .docs()
            .transactions
            .values()
            .filter(|t| t.paired_with == Some(parent_id))
            .cloned()
            .collect())
    }

    fn insert_template(&self, template: &NewTemplate) -> Result<i64> {
        let mut docs = self.docs();
        let id = docs.allocate_id();
        docs.templates.insert(id, template_from(id, template));
        Ok(id)
    }

    fn update_template(&self, id: i64, template: &NewTemplate) -> Result<()> {
        let mut docs = self.docs();
        match docs.templates.get_mut(&id) {
            Some(existing) => {
                *existing = template_from(id, template);
                Ok(())
            }
            None => Err(Error::NotFound(format!("template {}", id))),
        }
    }

    fn delete_template(&self, id: i64) -> Result<bool> {
        Ok(self.docs().templates.remove(&id).is_some())
    }

    fn get_template(&self, id: i64) -> Result<Option<RecurringTemplate>> {
        Ok(self.docs().templates.get(&id).cloned())
    }

    fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        Ok(self.docs().templates.values().cloned().collect())
    }

    fn find_templates(&self, key: &MatchKey) -> Result<Vec<RecurringTemplate>> {
        Ok(self
            .docs()
            .templates
            .values()
            .filter(|t| key.matches(&t.category, t.start_date, t.recurrence_type))
            .cloned()
            .collect())
    }

    fn find_paired_templates(&self, parent_id: i64) -> Result<Vec<RecurringTemplate>> {
        Ok(self
            .docs()
            .templates
            .values()
            .filter(|t| t.paired_with == Some(parent_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecurrenceType;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let id = store
            .insert_transaction(&NewTransaction::single(250.0, "Alimentos", false, date))
            .unwrap();
        let tx = store.get_transaction(id).unwrap().unwrap();
        assert_eq!(tx.category, "Alimentos");

        let mut edited = tx.to_new();
        edited.amount = 300.0;
        store.update_transaction(id, &edited).unwrap();
        assert_eq!(store.get_transaction(id).unwrap().unwrap().amount, 300.0);

        assert!(store.delete_transaction(id).unwrap());
        assert!(!store.delete_transaction(id).unwrap());
        assert!(store.list_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let tx = NewTransaction::single(1.0, "Otros", false, date);
        assert!(matches!(
            store.update_transaction(42, &tx),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(store.update_template(42, &tx), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_match_key_distinguishes_recurrence() {
        let store = MemoryStore::new();
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store
            .insert_transaction(&NewTransaction::recurring(
                100.0,
                "Hogar",
                false,
                RecurrenceType::Monthly,
                date,
            ))
            .unwrap();

        assert!(store
            .transaction_exists(&MatchKey::new("Hogar", Some(date), Some(RecurrenceType::Monthly)))
            .unwrap());
        assert!(!store
            .transaction_exists(&MatchKey::new("Hogar", Some(date), Some(RecurrenceType::Weekly)))
            .unwrap());
        assert!(!store
            .transaction_exists(&MatchKey::new("Hogar", Some(date), None))
            .unwrap());
    }

    #[test]
    fn test_list_recurring_templates_filters_flag() {
        let store = MemoryStore::new();
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store
            .insert_template(&NewTransaction::recurring(
                100.0,
                "Hogar",
                false,
                RecurrenceType::Monthly,
                date,
            ))
            .unwrap();
        let mut disabled = NewTransaction::recurring(5.0, "Otros", false, RecurrenceType::Weekly, date);
        disabled.is_recurring = false;
        store.insert_template(&disabled).unwrap();

        let recurring = store.list_recurring_templates().unwrap();
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0].category, "Hogar");
    }
}
