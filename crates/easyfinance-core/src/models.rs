//! Domain models for EasyFinance

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::DAY_MS;

/// Category used for salary income
pub const SALARY_CATEGORY: &str = "Sueldo";

/// Category used for the withholding expense paired with a salary
pub const TAX_CATEGORY: &str = "Impuestos";

/// Categories offered when recording a transaction
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Sueldo",
    "Otros",
    "Alimentos",
    "Transporte",
    "Entretenimiento",
    "Hogar",
    "Impuestos",
];

/// Categories offered for income
pub const INCOME_CATEGORIES: &[&str] = &["Sueldo", "Otros"];

/// Categories offered for expenses
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Alimentos",
    "Transporte",
    "Entretenimiento",
    "Hogar",
    "Impuestos",
    "Otros",
];

/// How often a recurring transaction repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurrenceType {
    Weekly,
    /// Every 15 days
    Biweekly,
    /// Every 30 days (not calendar months)
    Monthly,
}

impl RecurrenceType {
    pub const ALL: [RecurrenceType; 3] = [Self::Weekly, Self::Biweekly, Self::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Biweekly => "BIWEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    /// Label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Weekly => "Semanal",
            Self::Biweekly => "Quincenal",
            Self::Monthly => "Mensual",
        }
    }

    /// Fixed period length in milliseconds
    pub fn interval_ms(&self) -> i64 {
        match self {
            Self::Weekly => 7 * DAY_MS,
            Self::Biweekly => 15 * DAY_MS,
            Self::Monthly => 30 * DAY_MS,
        }
    }

    /// Pay periods per year, as used by the tax estimator
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Self::Weekly => 52.0,
            Self::Biweekly => 24.0,
            Self::Monthly => 12.0,
        }
    }
}

impl std::str::FromStr for RecurrenceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "semanal" => Ok(Self::Weekly),
            "biweekly" | "quincenal" => Ok(Self::Biweekly),
            "monthly" | "mensual" => Ok(Self::Monthly),
            _ => Err(format!("Unknown recurrence type: {}", s)),
        }
    }
}

impl std::fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded income or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Always non-negative; direction comes from `is_income`
    pub amount: f64,
    pub category: String,
    pub is_income: bool,
    pub is_recurring: bool,
    pub recurrence_type: Option<RecurrenceType>,
    pub start_date: Option<DateTime<Utc>>,
    /// For a tax expense, the salary record it was computed from
    pub paired_with: Option<i64>,
}

/// A recurring rule that produces transactions over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: i64,
    pub amount: f64,
    pub category: String,
    pub is_income: bool,
    pub is_recurring: bool,
    pub recurrence_type: Option<RecurrenceType>,
    pub start_date: Option<DateTime<Utc>>,
    pub paired_with: Option<i64>,
}

/// A transaction or template before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    pub category: String,
    pub is_income: bool,
    pub is_recurring: bool,
    pub recurrence_type: Option<RecurrenceType>,
    pub start_date: Option<DateTime<Utc>>,
    pub paired_with: Option<i64>,
}

/// Templates are stored from the same payload as transactions
pub type NewTemplate = NewTransaction;

impl NewTransaction {
    /// A one-off transaction on the given date
    pub fn single(
        amount: f64,
        category: impl Into<String>,
        is_income: bool,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            amount,
            category: category.into(),
            is_income,
            is_recurring: false,
            recurrence_type: None,
            start_date: Some(date),
            paired_with: None,
        }
    }

    /// A recurring transaction starting on the given date
    pub fn recurring(
        amount: f64,
        category: impl Into<String>,
        is_income: bool,
        recurrence: RecurrenceType,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            amount,
            category: category.into(),
            is_income,
            is_recurring: true,
            recurrence_type: Some(recurrence),
            start_date: Some(start),
            paired_with: None,
        }
    }

    pub fn is_salary(&self, salary_category: &str) -> bool {
        self.is_income && self.category == salary_category
    }
}

impl Transaction {
    pub fn is_salary(&self, salary_category: &str) -> bool {
        self.is_income && self.category == salary_category
    }

    /// Signed amount: positive for income, negative for expenses
    pub fn signed_amount(&self) -> f64 {
        if self.is_income {
            self.amount
        } else {
            -self.amount
        }
    }

    pub fn to_new(&self) -> NewTransaction {
        NewTransaction {
            amount: self.amount,
            category: self.category.clone(),
            is_income: self.is_income,
            is_recurring: self.is_recurring,
            recurrence_type: self.recurrence_type,
            start_date: self.start_date,
            paired_with: self.paired_with,
        }
    }
}

impl RecurringTemplate {
    pub fn is_salary(&self, salary_category: &str) -> bool {
        self.is_income && self.category == salary_category
    }

    pub fn to_new(&self) -> NewTemplate {
        NewTransaction {
            amount: self.amount,
            category: self.category.clone(),
            is_income: self.is_income,
            is_recurring: self.is_recurring,
            recurrence_type: self.recurrence_type,
            start_date: self.start_date,
            paired_with: self.paired_with,
        }
    }
}

/// The equality key used to detect an already materialized record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub category: String,
    pub start_date: Option<DateTime<Utc>>,
    pub recurrence_type: Option<RecurrenceType>,
}

impl MatchKey {
    pub fn new(
        category: impl Into<String>,
        start_date: Option<DateTime<Utc>>,
        recurrence_type: Option<RecurrenceType>,
    ) -> Self {
        Self {
            category: category.into(),
            start_date,
            recurrence_type,
        }
    }

    pub fn of(tx: &NewTransaction) -> Self {
        Self::new(tx.category.clone(), tx.start_date, tx.recurrence_type)
    }

    pub fn matches(
        &self,
        category: &str,
        start_date: Option<DateTime<Utc>>,
        recurrence_type: Option<RecurrenceType>,
    ) -> bool {
        self.category == category
            && self.start_date == start_date
            && self.recurrence_type == recurrence_type
    }
}

/// Convert epoch milliseconds (the storage format) to a UTC timestamp
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
