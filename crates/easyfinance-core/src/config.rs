//! Runtime configuration
//!
//! ## Resolution
//!
//! 1. An explicit path (`--config`)
//! 2. `EASYFINANCE_CONFIG`
//! 3. `<data dir>/easyfinance/config.toml`
//! 4. Built-in defaults
//!
//! Every key is optional; missing keys keep their default value.
//!
//! ```toml
//! [generation]
//! window_hours = 24
//! backfill = false
//! schedule_hours = 24
//!
//! [categories]
//! salary = "Sueldo"
//! tax = "Impuestos"
//!
//! [tax]
//! social_security_rate = 0.07
//! brackets = [
//!     { up_to = 100000.0, over = 0.0, rate = 0.0, base = 0.0 },
//!     { over = 100000.0, rate = 0.15, base = 0.0 },
//! ]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::generator::BackfillPolicy;
use crate::models::{SALARY_CATEGORY, TAX_CATEGORY};
use crate::recurrence::DEFAULT_WINDOW_MS;
use crate::tax::{TaxBracket, TaxTable};

/// Environment variable pointing at a config file
pub const CONFIG_PATH_ENV: &str = "EASYFINANCE_CONFIG";

/// Settings for the recurring generator and its scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// How long after a period boundary an occurrence may still be created
    pub window_hours: u32,
    pub backfill: BackfillPolicy,
    /// Interval between scheduled generation runs
    pub schedule_hours: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            window_hours: (DEFAULT_WINDOW_MS / (60 * 60 * 1000)) as u32,
            backfill: BackfillPolicy::Skip,
            schedule_hours: 24,
        }
    }
}

impl GenerationConfig {
    pub fn window_ms(&self) -> i64 {
        i64::from(self.window_hours) * 60 * 60 * 1000
    }
}

/// Category names with special meaning
#[derive(Debug, Clone, PartialEq)]
pub struct Categories {
    /// Income in this category gets a paired tax expense
    pub salary: String,
    /// Category of the paired tax expense
    pub tax: String,
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            salary: SALARY_CATEGORY.to_string(),
            tax: TAX_CATEGORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub generation: GenerationConfig,
    pub categories: Categories,
    pub tax: TaxTable,
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicit path that does not exist is an error; the implicit
    /// locations are simply skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            if !env_path.is_empty() {
                return Self::from_file(Path::new(&env_path));
            }
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML content on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(generation) = raw.generation {
            if let Some(hours) = generation.window_hours {
                config.generation.window_hours = hours;
            }
            if let Some(backfill) = generation.backfill {
                config.generation.backfill = if backfill {
                    BackfillPolicy::Backfill
                } else {
                    BackfillPolicy::Skip
                };
            }
            if let Some(hours) = generation.schedule_hours {
                config.generation.schedule_hours = hours;
            }
        }

        if let Some(categories) = raw.categories {
            if let Some(salary) = categories.salary {
                config.categories.salary = salary;
            }
            if let Some(tax) = categories.tax {
                config.categories.tax = tax;
            }
        }

        if let Some(tax) = raw.tax {
            if let Some(rate) = tax.social_security_rate {
                config.tax.social_security_rate = rate;
            }
            if let Some(brackets) = tax.brackets {
                config.tax.brackets = brackets;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.window_hours == 0 {
            return Err(Error::Config("generation.window_hours must be at least 1".into()));
        }
        if self.generation.schedule_hours == 0 {
            return Err(Error::Config(
                "generation.schedule_hours must be at least 1".into(),
            ));
        }
        if self.categories.salary.trim().is_empty() || self.categories.tax.trim().is_empty() {
            return Err(Error::Config("category names must not be empty".into()));
        }
        if self.categories.salary == self.categories.tax {
            return Err(Error::Config(
                "salary and tax categories must differ".into(),
            ));
        }
        self.tax.validate()
    }
}

/// Default config location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("easyfinance").join("config.toml"))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    generation: Option<RawGeneration>,
    categories: Option<RawCategories>,
    tax: Option<RawTax>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGeneration {
    window_hours: Option<u32>,
    backfill: Option<bool>,
    schedule_hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCategories {
    salary: Option<String>,
    tax: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTax {
    social_security_rate: Option<f64>,
    brackets: Option<Vec<TaxBracket>>,
}
