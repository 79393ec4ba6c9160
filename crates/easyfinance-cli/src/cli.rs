//! CLI argument definitions
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "easyfinance")]
#[command(about = "Track income, expenses and recurring payments", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to SQLite database (defaults to $EASYFINANCE_DB, then easyfinance.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to config file (defaults to $EASYFINANCE_CONFIG, then the user data dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON instead of tables where supported
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Record an income or expense
    Add(RecordArgs),

    /// List transactions, newest first
    List {
        /// Direction: all, income or expense
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// Date range: all, week or month
        #[arg(short, long, default_value = "all")]
        range: String,

        /// First day of a custom range (DD/MM/YYYY)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day of a custom range (DD/MM/YYYY)
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Change a stored transaction
    Edit {
        /// Transaction ID
        id: i64,

        /// New amount
        #[arg(short, long)]
        amount: Option<String>,

        /// New category
        #[arg(short, long)]
        category: Option<String>,

        /// Mark as income
        #[arg(long, conflicts_with = "expense")]
        income: bool,

        /// Mark as expense
        #[arg(long)]
        expense: bool,

        /// New recurrence (weekly, biweekly, monthly) or "none"
        #[arg(short, long)]
        recurrence: Option<String>,

        /// New date (DD/MM/YYYY)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Delete a transaction (a salary also removes its tax and templates)
    Delete {
        /// Transaction ID
        id: i64,
    },

    /// Manage recurring templates
    Templates {
        #[command(subcommand)]
        action: Option<TemplatesAction>,
    },

    /// Create the occurrences that are due now
    Generate {
        /// Create every missed occurrence instead of only the current one
        #[arg(long)]
        backfill: bool,
    },

    /// Run generation on a fixed interval until interrupted
    Schedule {
        /// Hours between runs (defaults to the config value)
        #[arg(long)]
        every_hours: Option<u32>,
    },

    /// Show income, expenses and balance up to today
    Summary,

    /// Show totals per category
    Categories,

    /// Show the previous, current and next fortnight
    Fortnights,

    /// Estimate payroll withholding for a salary
    Tax {
        /// Gross salary per period
        amount: String,

        /// Pay period: weekly, biweekly or monthly
        #[arg(short, long, default_value = "monthly")]
        recurrence: String,
    },

    /// Delete every transaction and template
    Reset {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Export all transactions and templates to CSV
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import transactions and templates from CSV
    Import {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export a filtered selection of transactions to CSV
    Report {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// First day (DD/MM/YYYY)
        #[arg(long)]
        from: Option<String>,

        /// Last day (DD/MM/YYYY)
        #[arg(long)]
        to: Option<String>,

        /// Leave incomes out
        #[arg(long)]
        no_incomes: bool,

        /// Leave expenses out
        #[arg(long)]
        no_expenses: bool,

        /// Leave recurring transactions out
        #[arg(long)]
        no_recurring: bool,

        /// Leave one-off transactions out
        #[arg(long)]
        no_non_recurring: bool,
    },
}

/// Fields of a new transaction or template
#[derive(clap::Args, Debug, Clone)]
pub struct RecordArgs {
    /// Amount (commas allowed, e.g. 1,250.50)
    pub amount: String,

    /// Category, e.g. Sueldo or Alimentos
    #[arg(short, long)]
    pub category: String,

    /// Record as income instead of expense
    #[arg(long)]
    pub income: bool,

    /// Repeat weekly, biweekly or monthly
    #[arg(short, long)]
    pub recurrence: Option<String>,

    /// Date (DD/MM/YYYY), defaults to today
    #[arg(short, long)]
    pub date: Option<String>,
}

#[derive(Subcommand)]
pub enum TemplatesAction {
    /// List recurring templates
    List,
    /// Add a template without recording a transaction
    Add(RecordArgs),
    /// Delete a template (a salary also removes its tax template)
    Delete {
        /// Template ID
        id: i64,
    },
}
