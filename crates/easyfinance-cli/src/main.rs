//! EasyFinance CLI - Personal income and expense tracker
//!
//! Usage:
//!   easyfinance init                          Initialize database
//!   easyfinance add 250 --category Alimentos  Record an expense
//!   easyfinance generate                      Create due recurring transactions
//!   easyfinance schedule --every-hours 24     Keep generating on an interval

mod cli;
mod commands;
mod scheduler;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use clap::Parser;
use easyfinance_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    let db_path = commands::resolve_db_path(cli.db.as_deref());
    let json = cli.json;

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path),
        Commands::Add(args) => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_add(&db, &config, &args)
        }
        Commands::List {
            kind,
            range,
            from,
            to,
            category,
        } => {
            let db = commands::open_db(&db_path)?;
            let filter = commands::build_filter(
                &kind,
                &range,
                from.as_deref(),
                to.as_deref(),
                category,
            )?;
            commands::cmd_list(&db, &filter, json)
        }
        Commands::Edit {
            id,
            amount,
            category,
            income,
            expense,
            recurrence,
            date,
        } => {
            let db = commands::open_db(&db_path)?;
            let direction = match (income, expense) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let changes = commands::EditArgs {
                amount,
                category,
                is_income: direction,
                recurrence,
                date,
            };
            commands::cmd_edit(&db, &config, id, &changes)
        }
        Commands::Delete { id } => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_delete(&db, &config, id)
        }
        Commands::Templates { action } => {
            let db = commands::open_db(&db_path)?;
            match action {
                None | Some(TemplatesAction::List) => commands::cmd_templates_list(&db, json),
                Some(TemplatesAction::Add(args)) => {
                    commands::cmd_templates_add(&db, &config, &args)
                }
                Some(TemplatesAction::Delete { id }) => {
                    commands::cmd_templates_delete(&db, &config, id)
                }
            }
        }
        Commands::Generate { backfill } => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_generate(&db, &config, backfill, json)
        }
        Commands::Schedule { every_hours } => {
            let db = commands::open_db(&db_path)?;
            let hours = every_hours.unwrap_or(config.generation.schedule_hours);
            scheduler::run_until_interrupted(db, config, hours).await
        }
        Commands::Summary => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_summary(&db, json)
        }
        Commands::Categories => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_categories(&db, json)
        }
        Commands::Fortnights => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_fortnights(&db, json)
        }
        Commands::Tax { amount, recurrence } => {
            commands::cmd_tax(&config, &amount, &recurrence, json)
        }
        Commands::Reset { yes } => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_reset(&db, yes)
        }
        Commands::Export { output } => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_export(&db, &output)
        }
        Commands::Import { file } => {
            let db = commands::open_db(&db_path)?;
            commands::cmd_import(&db, &file)
        }
        Commands::Report {
            output,
            category,
            from,
            to,
            no_incomes,
            no_expenses,
            no_recurring,
            no_non_recurring,
        } => {
            let db = commands::open_db(&db_path)?;
            let filter = commands::build_report_filter(
                category,
                from.as_deref(),
                to.as_deref(),
                !no_incomes,
                !no_expenses,
                !no_recurring,
                !no_non_recurring,
            )?;
            commands::cmd_report(&db, &filter, &output)
        }
    }
}
