//! Payroll withholding estimate for salary income
//!
//! Withholding has two parts: a flat social-security contribution on the
//! gross amount of each pay period, and an income tax computed on the
//! annualized net salary with a progressive bracket table and spread back
//! over the pay periods.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::RecurrenceType;

/// One row of the progressive income-tax table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Upper bound of annual net income for this bracket; `None` = no limit
    pub up_to: Option<f64>,
    /// Income above this amount is taxed at `rate`
    pub over: f64,
    pub rate: f64,
    /// Tax already accumulated by the lower brackets
    pub base: f64,
}

/// Social-security rate and income-tax brackets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxTable {
    pub social_security_rate: f64,
    pub brackets: Vec<TaxBracket>,
}

impl Default for TaxTable {
    fn default() -> Self {
        Self {
            social_security_rate: 0.07,
            brackets: vec![
                TaxBracket {
                    up_to: Some(100_000.0),
                    over: 0.0,
                    rate: 0.0,
                    base: 0.0,
                },
                TaxBracket {
                    up_to: Some(200_000.0),
                    over: 100_000.0,
                    rate: 0.15,
                    base: 0.0,
                },
                TaxBracket {
                    up_to: Some(350_000.0),
                    over: 200_000.0,
                    rate: 0.20,
                    base: 15_000.0,
                },
                TaxBracket {
                    up_to: Some(500_000.0),
                    over: 350_000.0,
                    rate: 0.25,
                    base: 45_000.0,
                },
                TaxBracket {
                    up_to: None,
                    over: 500_000.0,
                    rate: 0.30,
                    base: 82_500.0,
                },
            ],
        }
    }
}

/// Result of a withholding estimate, per pay period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxBreakdown {
    pub periods_per_year: f64,
    pub social_security: f64,
    pub annual_net: f64,
    pub annual_income_tax: f64,
    pub income_tax: f64,
    /// Social security plus income tax, rounded to cents; the amount of the
    /// paired expense
    pub total: f64,
}

/// Pay periods per year; a salary without recurrence counts as annual
pub fn periods_per_year(recurrence: Option<RecurrenceType>) -> f64 {
    recurrence.map_or(1.0, |r| r.periods_per_year())
}

impl TaxTable {
    /// Check that brackets are ordered and the last one is open-ended
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.social_security_rate) {
            return Err(Error::Config(format!(
                "social_security_rate must be in [0, 1), got {}",
                self.social_security_rate
            )));
        }
        let Some(last) = self.brackets.last() else {
            return Err(Error::Config("tax table has no brackets".into()));
        };
        if last.up_to.is_some() {
            return Err(Error::Config(
                "the last tax bracket must not have an upper bound".into(),
            ));
        }
        let bounds: Vec<f64> = self.brackets.iter().filter_map(|b| b.up_to).collect();
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(
                "tax brackets must be sorted by upper bound".into(),
            ));
        }
        Ok(())
    }

    /// Annual income tax for an annual net income
    pub fn annual_income_tax(&self, annual_net: f64) -> f64 {
        let bracket = self
            .brackets
            .iter()
            .find(|b| b.up_to.map_or(true, |limit| annual_net <= limit));

        match bracket {
            Some(b) => ((annual_net - b.over) * b.rate + b.base).max(0.0),
            None => 0.0,
        }
    }

    /// Withholding for one pay period of `gross`
    pub fn estimate(&self, gross: f64, recurrence: Option<RecurrenceType>) -> TaxBreakdown {
        let gross = if gross.is_finite() { gross.max(0.0) } else { 0.0 };
        let periods = periods_per_year(recurrence);

        let social_security = gross * self.social_security_rate;
        let annual_gross = gross * periods;
        let annual_net = annual_gross - social_security * periods;
        let annual_income_tax = self.annual_income_tax(annual_net);
        let income_tax = annual_income_tax / periods;

        TaxBreakdown {
            periods_per_year: periods,
            social_security,
            annual_net,
            annual_income_tax,
            income_tax,
            total: round_cents(social_security + income_tax),
        }
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Estimate with the default table
pub fn estimate(gross: f64, recurrence: Option<RecurrenceType>) -> TaxBreakdown {
    TaxTable::default().estimate(gross, recurrence)
}
