//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::Path;

use chrono::{Duration, Local, NaiveDate};
use easyfinance_core::db::{Database, DEFAULT_DB_PATH};
use easyfinance_core::{Config, DateRange, KindFilter, RecurrenceType};

use crate::cli::RecordArgs;
use crate::commands::{self, format_amount, EditArgs};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn record_args(amount: &str, category: &str, income: bool) -> RecordArgs {
    RecordArgs {
        amount: amount.to_string(),
        category: category.to_string(),
        income,
        recurrence: None,
        date: None,
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ========== Helper Tests ==========

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(0.0), "C$ 0.00");
    assert_eq!(format_amount(845.0), "C$ 845.00");
    assert_eq!(format_amount(1234.5), "C$ 1,234.50");
    assert_eq!(format_amount(1_000_000.0), "C$ 1,000,000.00");
    assert_eq!(format_amount(-2500.75), "-C$ 2,500.75");
}

#[test]
fn test_parse_date_formats() {
    assert_eq!(commands::parse_date("05/01/2024").unwrap(), day(2024, 1, 5));
    assert_eq!(commands::parse_date("2024-01-05").unwrap(), day(2024, 1, 5));
    assert!(commands::parse_date("31/02/2024").is_err());
    assert!(commands::parse_date("yesterday").is_err());
}

#[test]
fn test_local_day_start_is_local_midnight() {
    let start = commands::local_day_start(day(2024, 3, 10)).unwrap();
    assert_eq!(commands::format_date(Some(start)), "10/03/2024");
    assert_eq!(commands::format_date(None), "--/--/----");
}

#[test]
fn test_resolve_db_path_prefers_flag() {
    let path = commands::resolve_db_path(Some(Path::new("/tmp/custom.db")));
    assert_eq!(path, Path::new("/tmp/custom.db"));
}

#[test]
fn test_db_path_resolution_order() {
    let flag = Path::new("/tmp/flag.db");
    assert_eq!(
        commands::db_path_from(Some(flag), Some("/tmp/env.db")),
        flag
    );
    assert_eq!(
        commands::db_path_from(None, Some("/tmp/env.db")),
        Path::new("/tmp/env.db")
    );
    assert_eq!(
        commands::db_path_from(None, Some("")),
        Path::new(DEFAULT_DB_PATH)
    );
    assert_eq!(commands::db_path_from(None, None), Path::new(DEFAULT_DB_PATH));
}

// ========== Init Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("easyfinance.db");

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());

    // Running again keeps the data
    let db = commands::open_db(&path).unwrap();
    commands::cmd_add(&db, &Config::default(), &record_args("10", "Otros", false)).unwrap();
    commands::cmd_init(&path).unwrap();
    assert_eq!(db.count_transactions().unwrap(), 1);
}

#[test]
fn test_cmd_reset_clears_records() {
    let db = setup_test_db();
    let config = Config::default();
    let mut salary = record_args("10000", "Sueldo", true);
    salary.recurrence = Some("monthly".to_string());
    commands::cmd_add(&db, &config, &salary).unwrap();

    commands::cmd_reset(&db, true).unwrap();
    assert_eq!(db.count_transactions().unwrap(), 0);
    assert!(db.list_templates().unwrap().is_empty());
}

// ========== Transaction Command Tests ==========

#[test]
fn test_record_from_args_defaults_to_today() {
    let today = day(2024, 6, 1);
    let record = commands::record_from_args(&record_args("1,250.50", "Alimentos", false), today)
        .unwrap();
    assert_eq!(record.amount, 1250.50);
    assert!(!record.is_recurring);
    assert_eq!(
        record.start_date,
        Some(commands::local_day_start(today).unwrap())
    );
}

#[test]
fn test_record_from_args_rejects_bad_input() {
    let today = day(2024, 6, 1);
    assert!(commands::record_from_args(&record_args("abc", "Otros", false), today).is_err());

    let mut args = record_args("10", "Otros", false);
    args.recurrence = Some("yearly".to_string());
    assert!(commands::record_from_args(&args, today).is_err());
}

#[test]
fn test_cmd_add_salary_records_withholding() {
    let db = setup_test_db();
    let mut args = record_args("10000", "Sueldo", true);
    args.recurrence = Some("mensual".to_string());
    args.date = Some("01/01/2024".to_string());

    commands::cmd_add(&db, &Config::default(), &args).unwrap();

    let transactions = db.list_transactions().unwrap();
    assert_eq!(transactions.len(), 2);
    let tax = transactions
        .iter()
        .find(|t| t.category == "Impuestos")
        .unwrap();
    assert_eq!(tax.amount, 845.0);
    assert!(!tax.is_income);

    let templates = db.list_templates().unwrap();
    assert_eq!(templates.len(), 2);
    assert!(templates
        .iter()
        .all(|t| t.recurrence_type == Some(RecurrenceType::Monthly)));
}

#[test]
fn test_cmd_add_rejects_negative_amount() {
    let db = setup_test_db();
    let result = commands::cmd_add(&db, &Config::default(), &record_args("-5", "Otros", false));
    assert!(result.is_err());
    assert_eq!(db.count_transactions().unwrap(), 0);
}

#[test]
fn test_build_filter() {
    let filter = commands::build_filter("income", "week", None, None, None).unwrap();
    assert_eq!(filter.kind, KindFilter::Income);
    assert_eq!(filter.range, DateRange::LastWeek);

    let filter = commands::build_filter(
        "all",
        "all",
        Some("01/01/2024"),
        Some("15/01/2024"),
        Some("Hogar".to_string()),
    )
    .unwrap();
    assert_eq!(
        filter.range,
        DateRange::Custom {
            from: day(2024, 1, 1),
            to: day(2024, 1, 15)
        }
    );
    assert_eq!(filter.category.as_deref(), Some("Hogar"));

    assert!(commands::build_filter("sideways", "all", None, None, None).is_err());
    assert!(commands::build_filter("all", "decade", None, None, None).is_err());
    assert!(
        commands::build_filter("all", "all", Some("15/01/2024"), Some("01/01/2024"), None)
            .is_err()
    );
}

#[test]
fn test_cmd_list_empty_and_filled() {
    let db = setup_test_db();
    let filter = commands::build_filter("all", "all", None, None, None).unwrap();
    assert!(commands::cmd_list(&db, &filter, false).is_ok());

    commands::cmd_add(&db, &Config::default(), &record_args("99.90", "Entretenimiento", false))
        .unwrap();
    assert!(commands::cmd_list(&db, &filter, false).is_ok());
    assert!(commands::cmd_list(&db, &filter, true).is_ok());
}

#[test]
fn test_cmd_edit_changes_fields() {
    let db = setup_test_db();
    let config = Config::default();
    commands::cmd_add(&db, &config, &record_args("40", "Transporte", false)).unwrap();
    let id = db.list_transactions().unwrap()[0].id;

    let changes = EditArgs {
        amount: Some("55.25".to_string()),
        category: Some("Otros".to_string()),
        date: Some("02/02/2024".to_string()),
        ..Default::default()
    };
    commands::cmd_edit(&db, &config, id, &changes).unwrap();

    let tx = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(tx.amount, 55.25);
    assert_eq!(tx.category, "Otros");
    assert_eq!(commands::format_date(tx.start_date), "02/02/2024");
    assert!(!tx.is_income);
}

#[test]
fn test_cmd_edit_recurrence_none_clears_it() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("3500", "Hogar", false);
    args.recurrence = Some("monthly".to_string());
    commands::cmd_add(&db, &config, &args).unwrap();
    let id = db.list_transactions().unwrap()[0].id;

    let changes = EditArgs {
        recurrence: Some("none".to_string()),
        ..Default::default()
    };
    commands::cmd_edit(&db, &config, id, &changes).unwrap();

    let tx = db.get_transaction(id).unwrap().unwrap();
    assert!(!tx.is_recurring);
    assert_eq!(tx.recurrence_type, None);
    // The template it owned no longer generates
    assert!(db.list_templates().unwrap().is_empty());
}

#[test]
fn test_cmd_edit_into_recurring_adds_template() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("3500", "Hogar", false);
    args.date = Some("05/01/2024".to_string());
    commands::cmd_add(&db, &config, &args).unwrap();
    let id = db.list_transactions().unwrap()[0].id;
    assert!(db.list_templates().unwrap().is_empty());

    let changes = EditArgs {
        recurrence: Some("weekly".to_string()),
        ..Default::default()
    };
    commands::cmd_edit(&db, &config, id, &changes).unwrap();

    let templates = db.list_templates().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].category, "Hogar");
    assert_eq!(templates[0].recurrence_type, Some(RecurrenceType::Weekly));
    assert_eq!(commands::format_date(templates[0].start_date), "05/01/2024");
}

#[test]
fn test_cmd_edit_into_salary_adds_withholding() {
    let db = setup_test_db();
    let config = Config::default();
    commands::cmd_add(&db, &config, &record_args("10000", "Otros", true)).unwrap();
    let id = db.list_transactions().unwrap()[0].id;

    let changes = EditArgs {
        category: Some("Sueldo".to_string()),
        ..Default::default()
    };
    commands::cmd_edit(&db, &config, id, &changes).unwrap();

    let paired = db.find_paired_transactions(id).unwrap();
    assert_eq!(paired.len(), 1);
    assert_eq!(paired[0].category, "Impuestos");
}

#[test]
fn test_cmd_edit_salary_updates_withholding() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("10000", "Sueldo", true);
    args.recurrence = Some("monthly".to_string());
    commands::cmd_add(&db, &config, &args).unwrap();
    let salary_id = db
        .list_transactions()
        .unwrap()
        .into_iter()
        .find(|t| t.category == "Sueldo")
        .unwrap()
        .id;

    let changes = EditArgs {
        amount: Some("5000".to_string()),
        ..Default::default()
    };
    commands::cmd_edit(&db, &config, salary_id, &changes).unwrap();

    let paired = db.find_paired_transactions(salary_id).unwrap();
    assert_eq!(paired.len(), 1);
    let expected = config
        .tax
        .estimate(5000.0, Some(RecurrenceType::Monthly))
        .total;
    assert!((paired[0].amount - expected).abs() < 1e-9);
}

#[test]
fn test_cmd_edit_nonexistent() {
    let db = setup_test_db();
    let result = commands::cmd_edit(&db, &Config::default(), 99999, &EditArgs::default());
    assert!(result.is_err());
}

#[test]
fn test_cmd_delete_salary_cascades() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("10000", "Sueldo", true);
    args.recurrence = Some("biweekly".to_string());
    commands::cmd_add(&db, &config, &args).unwrap();
    commands::cmd_add(&db, &config, &record_args("20", "Alimentos", false)).unwrap();

    let salary_id = db
        .list_transactions()
        .unwrap()
        .into_iter()
        .find(|t| t.category == "Sueldo")
        .unwrap()
        .id;
    commands::cmd_delete(&db, &config, salary_id).unwrap();

    let remaining: Vec<String> = db
        .list_transactions()
        .unwrap()
        .into_iter()
        .map(|t| t.category)
        .collect();
    assert_eq!(remaining, vec!["Alimentos".to_string()]);
    assert!(db.list_templates().unwrap().is_empty());
}

#[test]
fn test_cmd_delete_nonexistent() {
    let db = setup_test_db();
    assert!(commands::cmd_delete(&db, &Config::default(), 42).is_err());
}

// ========== Template Command Tests ==========

#[test]
fn test_cmd_templates_add_requires_recurrence() {
    let db = setup_test_db();
    let result =
        commands::cmd_templates_add(&db, &Config::default(), &record_args("3500", "Hogar", false));
    assert!(result.is_err());
    assert!(db.list_templates().unwrap().is_empty());
}

#[test]
fn test_cmd_templates_add_list_delete() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("3500", "Hogar", false);
    args.recurrence = Some("quincenal".to_string());
    args.date = Some("05/01/2024".to_string());

    commands::cmd_templates_add(&db, &config, &args).unwrap();
    // A template alone records no transaction
    assert_eq!(db.count_transactions().unwrap(), 0);

    let templates = db.list_templates().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].recurrence_type, Some(RecurrenceType::Biweekly));

    assert!(commands::cmd_templates_list(&db, false).is_ok());
    assert!(commands::cmd_templates_list(&db, true).is_ok());

    commands::cmd_templates_delete(&db, &config, templates[0].id).unwrap();
    assert!(db.list_templates().unwrap().is_empty());
}

// ========== Generation Tests ==========

#[test]
fn test_run_generation_creates_due_occurrence() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("3500", "Hogar", false);
    args.recurrence = Some("weekly".to_string());
    args.date = Some("01/01/2024".to_string());
    commands::cmd_templates_add(&db, &config, &args).unwrap();

    // One week after the start, early in the day
    let start = commands::local_day_start(day(2024, 1, 1))
        .unwrap()
        .with_timezone(&Local);
    let now = start + Duration::days(7) + Duration::hours(3);

    let report = commands::run_generation(&db, &config, false, &now).unwrap();
    assert_eq!(report.generated_count(), 1);
    assert_eq!(
        commands::format_date(Some(report.generated[0].date)),
        "08/01/2024"
    );

    let again = commands::run_generation(&db, &config, false, &now).unwrap();
    assert_eq!(again.generated_count(), 0);
}

#[test]
fn test_run_generation_backfill_flag() {
    let db = setup_test_db();
    let config = Config::default();
    let mut args = record_args("100", "Otros", false);
    args.recurrence = Some("weekly".to_string());
    args.date = Some("01/01/2024".to_string());
    commands::cmd_templates_add(&db, &config, &args).unwrap();

    let start = commands::local_day_start(day(2024, 1, 1))
        .unwrap()
        .with_timezone(&Local);
    // Between boundaries: nothing is due without backfill
    let now = start + Duration::days(24);

    let skipped = commands::run_generation(&db, &config, false, &now).unwrap();
    assert_eq!(skipped.generated_count(), 0);

    // Start plus the three weekly boundaries before now
    let filled = commands::run_generation(&db, &config, true, &now).unwrap();
    assert_eq!(filled.generated_count(), 4);
}

#[test]
fn test_cmd_generate_with_nothing_due() {
    let db = setup_test_db();
    assert!(commands::cmd_generate(&db, &Config::default(), false, false).is_ok());
    assert!(commands::cmd_generate(&db, &Config::default(), false, true).is_ok());
}

// ========== Report Command Tests ==========

#[test]
fn test_report_commands_run() {
    let db = setup_test_db();
    let config = Config::default();
    commands::cmd_add(&db, &config, &record_args("10000", "Sueldo", true)).unwrap();
    commands::cmd_add(&db, &config, &record_args("250", "Alimentos", false)).unwrap();

    for json in [false, true] {
        assert!(commands::cmd_summary(&db, json).is_ok());
        assert!(commands::cmd_categories(&db, json).is_ok());
        assert!(commands::cmd_fortnights(&db, json).is_ok());
    }
}

#[test]
fn test_cmd_tax() {
    let config = Config::default();
    assert!(commands::cmd_tax(&config, "10,000", "monthly", false).is_ok());
    assert!(commands::cmd_tax(&config, "10000", "weekly", true).is_ok());
    assert!(commands::cmd_tax(&config, "ten", "monthly", false).is_err());
    assert!(commands::cmd_tax(&config, "10000", "daily", false).is_err());
}

#[test]
fn test_build_report_filter_requires_a_selection() {
    assert!(commands::build_report_filter(None, None, None, false, false, true, true).is_err());
    assert!(commands::build_report_filter(None, None, None, true, true, false, false).is_err());
    assert!(commands::build_report_filter(None, Some("bad"), None, true, true, true, true).is_err());

    let filter = commands::build_report_filter(
        Some("Hogar".to_string()),
        Some("01/01/2024"),
        Some("31/01/2024"),
        false,
        true,
        true,
        true,
    )
    .unwrap();
    assert_eq!(filter.start, Some(day(2024, 1, 1)));
    assert_eq!(filter.end, Some(day(2024, 1, 31)));
    assert!(!filter.show_incomes);
}

#[test]
fn test_cmd_report_writes_filtered_rows() {
    let db = setup_test_db();
    let config = Config::default();
    let mut rent = record_args("3500", "Hogar", false);
    rent.date = Some("05/01/2024".to_string());
    commands::cmd_add(&db, &config, &rent).unwrap();
    let mut food = record_args("250", "Alimentos", false);
    food.date = Some("06/01/2024".to_string());
    commands::cmd_add(&db, &config, &food).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.csv");
    let filter = commands::build_report_filter(
        Some("Hogar".to_string()),
        None,
        None,
        true,
        true,
        true,
        true,
    )
    .unwrap();
    commands::cmd_report(&db, &filter, &output).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("Hogar"));
    assert!(content.contains("05/01/2024"));
    assert!(!content.contains("Alimentos"));
}

// ========== Export/Import Command Tests ==========

#[test]
fn test_cmd_export_then_import() {
    let source = setup_test_db();
    let config = Config::default();
    let mut salary = record_args("10000", "Sueldo", true);
    salary.recurrence = Some("monthly".to_string());
    salary.date = Some("01/01/2024".to_string());
    commands::cmd_add(&source, &config, &salary).unwrap();
    commands::cmd_add(&source, &config, &record_args("40", "Transporte", false)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("backup.csv");
    commands::cmd_export(&source, &file).unwrap();

    let target = setup_test_db();
    commands::cmd_import(&target, &file).unwrap();
    assert_eq!(target.count_transactions().unwrap(), 3);
    assert_eq!(target.list_templates().unwrap().len(), 2);

    // Importing the same file again updates rather than duplicates
    commands::cmd_import(&target, &file).unwrap();
    assert_eq!(target.count_transactions().unwrap(), 3);
}

#[test]
fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    assert!(commands::cmd_import(&db, Path::new("/nonexistent/backup.csv")).is_err());
}
