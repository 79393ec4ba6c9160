//! Recurring transaction generator
//!
//! One run evaluates every recurring template against the current time and
//! materializes the occurrences that are due. Salary occurrences also get
//! their withholding expense. Runs are idempotent: an occurrence whose
//! (category, date, recurrence) is already stored is left alone, so running
//! twice inside the same window creates nothing new.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{Categories, Config};
use crate::error::{Error, Result};
use crate::models::{MatchKey, NewTransaction, RecurrenceType, RecurringTemplate};
use crate::recurrence::{boundaries_until, due_occurrence_within, DEFAULT_WINDOW_MS};
use crate::store::Store;
use crate::tax::TaxTable;

/// What to do with period boundaries whose window already closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackfillPolicy {
    /// Only the boundary whose window is open right now
    #[default]
    Skip,
    /// Every boundary from the start date up to now
    Backfill,
}

/// A transaction created by a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedOccurrence {
    pub template_id: i64,
    pub transaction_id: i64,
    pub category: String,
    pub amount: f64,
    pub is_income: bool,
    pub recurrence_type: RecurrenceType,
    pub date: DateTime<Utc>,
    /// Set when this occurrence is a tax expense paired with a salary
    pub paired_with: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    pub templates_evaluated: usize,
    pub generated: Vec<GeneratedOccurrence>,
    /// Due occurrences that were already stored
    pub already_present: usize,
    /// Templates whose evaluation failed
    pub failed: usize,
}

impl GenerationReport {
    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }
}

pub struct RecurringGenerator<'a, S: Store> {
    store: &'a S,
    categories: Categories,
    tax: TaxTable,
    window_ms: i64,
    backfill: BackfillPolicy,
}

impl<'a, S: Store> RecurringGenerator<'a, S> {
    /// Generator with the default categories, tax table and 24h window
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            categories: Categories::default(),
            tax: TaxTable::default(),
            window_ms: DEFAULT_WINDOW_MS,
            backfill: BackfillPolicy::Skip,
        }
    }

    pub fn with_config(store: &'a S, config: &Config) -> Self {
        Self {
            store,
            categories: config.categories.clone(),
            tax: config.tax.clone(),
            window_ms: config.generation.window_ms(),
            backfill: config.generation.backfill,
        }
    }

    pub fn backfill(mut self, policy: BackfillPolicy) -> Self {
        self.backfill = policy;
        self
    }

    /// Evaluate every recurring template once
    ///
    /// A failure on one template is logged and counted; the remaining
    /// templates are still evaluated.
    pub fn run<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<GenerationReport> {
        let templates = self.store.list_recurring_templates()?;
        let mut report = GenerationReport {
            templates_evaluated: templates.len(),
            ..Default::default()
        };

        for template in &templates {
            if let Err(e) = self.process_template(template, now, &mut report) {
                error!(
                    "Failed to generate occurrences for template {} ({}): {}",
                    template.id, template.category, e
                );
                report.failed += 1;
            }
        }

        info!(
            "Generation run: {} templates, {} created, {} already present, {} failed",
            report.templates_evaluated,
            report.generated.len(),
            report.already_present,
            report.failed
        );
        Ok(report)
    }

    fn process_template<Tz: TimeZone>(
        &self,
        template: &RecurringTemplate,
        now: &DateTime<Tz>,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let (Some(start), Some(recurrence)) = (template.start_date, template.recurrence_type)
        else {
            debug!(
                "Template {} has no start date or recurrence, skipping",
                template.id
            );
            return Ok(());
        };
        if !template.amount.is_finite() || template.amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "template amount {} is not a valid amount",
                template.amount
            )));
        }

        let start = start.with_timezone(&now.timezone());
        let dates: Vec<DateTime<Tz>> = match self.backfill {
            BackfillPolicy::Skip => due_occurrence_within(now, &start, recurrence, self.window_ms)
                .into_iter()
                .collect(),
            BackfillPolicy::Backfill => boundaries_until(now, &start, recurrence),
        };

        for date in dates {
            self.materialize(template, recurrence, date.with_timezone(&Utc), report)?;
        }
        Ok(())
    }

    fn materialize(
        &self,
        template: &RecurringTemplate,
        recurrence: RecurrenceType,
        date: DateTime<Utc>,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let key = MatchKey::new(template.category.clone(), Some(date), Some(recurrence));

        let existing = self.store.find_transactions(&key)?;
        let occurrence_id = match existing.first() {
            Some(tx) => {
                debug!(
                    "Occurrence already exists: {} on {}",
                    template.category,
                    date.format("%d/%m/%Y")
                );
                report.already_present += 1;
                tx.id
            }
            None => {
                let tx = NewTransaction {
                    amount: template.amount,
                    category: template.category.clone(),
                    is_income: template.is_income,
                    is_recurring: template.is_recurring,
                    recurrence_type: Some(recurrence),
                    start_date: Some(date),
                    paired_with: None,
                };
                let id = self.store.insert_transaction(&tx)?;
                info!(
                    "Generated {} {} of {:.2} on {}",
                    if template.is_income { "income" } else { "expense" },
                    template.category,
                    template.amount,
                    date.format("%d/%m/%Y")
                );
                report.generated.push(GeneratedOccurrence {
                    template_id: template.id,
                    transaction_id: id,
                    category: template.category.clone(),
                    amount: template.amount,
                    is_income: template.is_income,
                    recurrence_type: recurrence,
                    date,
                    paired_with: None,
                });
                id
            }
        };

        if template.is_salary(&self.categories.salary) {
            self.ensure_tax(template, recurrence, date, occurrence_id, report)?;
        }
        Ok(())
    }

    fn ensure_tax(
        &self,
        template: &RecurringTemplate,
        recurrence: RecurrenceType,
        date: DateTime<Utc>,
        salary_id: i64,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let tax_key = MatchKey::new(self.categories.tax.clone(), Some(date), Some(recurrence));
        if !self.store.find_paired_transactions(salary_id)?.is_empty()
            || self.store.transaction_exists(&tax_key)?
        {
            debug!("Tax already recorded for {}", date.format("%d/%m/%Y"));
            report.already_present += 1;
            return Ok(());
        }

        let breakdown = self.tax.estimate(template.amount, Some(recurrence));
        debug!(
            "Salary {:.2}: social security {:.2}, income tax {:.2}, total {:.2}",
            template.amount, breakdown.social_security, breakdown.income_tax, breakdown.total
        );

        let tax = NewTransaction {
            amount: breakdown.total,
            category: self.categories.tax.clone(),
            is_income: false,
            is_recurring: template.is_recurring,
            recurrence_type: Some(recurrence),
            start_date: Some(date),
            paired_with: Some(salary_id),
        };
        let id = self.store.insert_transaction(&tax)?;
        info!(
            "Generated tax expense of {:.2} on {}",
            breakdown.total,
            date.format("%d/%m/%Y")
        );
        report.generated.push(GeneratedOccurrence {
            template_id: template.id,
            transaction_id: id,
            category: tax.category,
            amount: breakdown.total,
            is_income: false,
            recurrence_type: recurrence,
            date,
            paired_with: Some(salary_id),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, FixedOffset};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn add_template(store: &MemoryStore, amount: f64, category: &str, is_income: bool) -> i64 {
        store
            .insert_template(&NewTransaction::recurring(
                amount,
                category,
                is_income,
                RecurrenceType::Weekly,
                utc(2024, 1, 1, 8),
            ))
            .unwrap()
    }

    #[test]
    fn test_generates_due_occurrence() {
        let store = MemoryStore::new();
        let template_id = add_template(&store, 50.0, "Transporte", false);

        let report = RecurringGenerator::new(&store)
            .run(&utc(2024, 1, 8, 10))
            .unwrap();

        assert_eq!(report.templates_evaluated, 1);
        assert_eq!(report.generated.len(), 1);
        let occurrence = &report.generated[0];
        assert_eq!(occurrence.template_id, template_id);
        assert_eq!(occurrence.date, utc(2024, 1, 8, 0));

        let txs = store.list_transactions().unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, 50.0);
        assert!(!txs[0].is_income);
        assert!(txs[0].is_recurring);
    }

    #[test]
    fn test_second_run_in_window_is_noop() {
        let store = MemoryStore::new();
        add_template(&store, 50.0, "Transporte", false);
        let generator = RecurringGenerator::new(&store);

        generator.run(&utc(2024, 1, 8, 9)).unwrap();
        let second = generator.run(&utc(2024, 1, 8, 20)).unwrap();

        assert!(second.generated.is_empty());
        assert_eq!(second.already_present, 1);
        assert_eq!(store.list_transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_nothing_outside_window() {
        let store = MemoryStore::new();
        add_template(&store, 50.0, "Transporte", false);

        let report = RecurringGenerator::new(&store)
            .run(&utc(2024, 1, 10, 12))
            .unwrap();
        assert!(report.generated.is_empty());
        assert!(store.list_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_salary_gets_paired_tax() {
        let store = MemoryStore::new();
        store
            .insert_template(&NewTransaction::recurring(
                10_000.0,
                "Sueldo",
                true,
                RecurrenceType::Monthly,
                utc(2024, 1, 1, 0),
            ))
            .unwrap();
        let generator = RecurringGenerator::new(&store);

        let report = generator.run(&utc(2024, 1, 31, 5)).unwrap();
        assert_eq!(report.generated.len(), 2);

        let salary = &report.generated[0];
        let tax = &report.generated[1];
        assert_eq!(salary.category, "Sueldo");
        assert_eq!(tax.category, "Impuestos");
        assert!((tax.amount - 845.0).abs() < 1e-6);
        assert_eq!(tax.paired_with, Some(salary.transaction_id));
        assert_eq!(tax.date, salary.date);

        let stored = store.get_transaction(tax.transaction_id).unwrap().unwrap();
        assert!(!stored.is_income);
        assert_eq!(stored.recurrence_type, Some(RecurrenceType::Monthly));

        // Rerun: salary and tax both already present
        let again = generator.run(&utc(2024, 1, 31, 22)).unwrap();
        assert!(again.generated.is_empty());
        assert_eq!(again.already_present, 2);
    }

    #[test]
    fn test_legacy_tax_without_link_is_recognized() {
        let store = MemoryStore::new();
        let date = utc(2024, 1, 31, 0);
        store
            .insert_template(&NewTransaction::recurring(
                10_000.0,
                "Sueldo",
                true,
                RecurrenceType::Monthly,
                utc(2024, 1, 1, 0),
            ))
            .unwrap();
        store
            .insert_transaction(&NewTransaction::recurring(
                845.0,
                "Impuestos",
                false,
                RecurrenceType::Monthly,
                date,
            ))
            .unwrap();

        let report = RecurringGenerator::new(&store)
            .run(&utc(2024, 1, 31, 5))
            .unwrap();
        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.generated[0].category, "Sueldo");
        assert_eq!(store.list_transactions().unwrap().len(), 2);
    }

    #[test]
    fn test_backfill_materializes_missed_boundaries() {
        let store = MemoryStore::new();
        add_template(&store, 20.0, "Otros", false);

        let report = RecurringGenerator::new(&store)
            .backfill(BackfillPolicy::Backfill)
            .run(&utc(2024, 1, 23, 0))
            .unwrap();

        let dates: Vec<_> = report.generated.iter().map(|o| o.date).collect();
        assert_eq!(
            dates,
            vec![
                utc(2024, 1, 1, 0),
                utc(2024, 1, 8, 0),
                utc(2024, 1, 15, 0),
                utc(2024, 1, 22, 0),
            ]
        );
    }

    #[test]
    fn test_skips_non_recurring_and_incomplete_templates() {
        let store = MemoryStore::new();
        let mut disabled =
            NewTransaction::recurring(1.0, "Otros", false, RecurrenceType::Weekly, utc(2024, 1, 1, 0));
        disabled.is_recurring = false;
        store.insert_template(&disabled).unwrap();

        let mut undated =
            NewTransaction::recurring(1.0, "Hogar", false, RecurrenceType::Weekly, utc(2024, 1, 1, 0));
        undated.start_date = None;
        store.insert_template(&undated).unwrap();

        let report = RecurringGenerator::new(&store)
            .run(&utc(2024, 1, 1, 3))
            .unwrap();
        assert_eq!(report.templates_evaluated, 1);
        assert!(report.generated.is_empty());
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_bad_template_does_not_abort_run() {
        let store = MemoryStore::new();
        let mut broken =
            NewTransaction::recurring(1.0, "Otros", false, RecurrenceType::Weekly, utc(2024, 1, 1, 8));
        broken.amount = f64::NAN;
        store.insert_template(&broken).unwrap();
        add_template(&store, 50.0, "Transporte", false);

        let report = RecurringGenerator::new(&store)
            .run(&utc(2024, 1, 8, 10))
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.generated.len(), 1);
    }

    #[test]
    fn test_occurrence_stamped_at_local_midnight() {
        let managua = FixedOffset::west_opt(6 * 3600).unwrap();
        let store = MemoryStore::new();
        // 2024-01-01 20:00 in Managua
        store
            .insert_template(&NewTransaction::recurring(
                5.0,
                "Otros",
                false,
                RecurrenceType::Weekly,
                utc(2024, 1, 2, 2),
            ))
            .unwrap();

        let now = managua.with_ymd_and_hms(2024, 1, 8, 21, 0, 0).unwrap();
        let report = RecurringGenerator::new(&store).run(&now).unwrap();
        assert_eq!(report.generated.len(), 1);
        // Local midnight of 2024-01-08 in Managua is 06:00 UTC
        assert_eq!(report.generated[0].date, utc(2024, 1, 8, 6));
    }

    #[test]
    fn test_config_window_and_categories() {
        let mut config = Config::default();
        config.generation.window_hours = 72;
        config.categories.salary = "Salario".into();

        let store = MemoryStore::new();
        store
            .insert_template(&NewTransaction::recurring(
                1_000.0,
                "Salario",
                true,
                RecurrenceType::Weekly,
                utc(2024, 1, 1, 0),
            ))
            .unwrap();

        let now = utc(2024, 1, 8, 0) + Duration::hours(48);
        let report = RecurringGenerator::with_config(&store, &config)
            .run(&now)
            .unwrap();
        assert_eq!(report.generated.len(), 2);
        assert_eq!(report.generated[1].category, "Impuestos");
    }
}
