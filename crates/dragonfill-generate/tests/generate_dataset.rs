use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use dragonfill_core::{
    BusinessConfig, HolidayCalendar, ReferenceCatalogs, TableName, UnmatchedRentalPolicy, Value,
};
use dragonfill_generate::{GenerateOptions, GenerationEngine, GenerationError, check_dataset};

fn small_config() -> BusinessConfig {
    let mut config = BusinessConfig::default();
    config.shop.lifetime_days = Some(150);
    config.shop.holidays = HolidayCalendar::None;
    config.customers.customers_number = 400;
    config
}

fn catalogs() -> ReferenceCatalogs {
    ReferenceCatalogs::bundled().expect("bundled catalogs")
}

fn engine(seed: u64) -> GenerationEngine {
    GenerationEngine::new(GenerateOptions {
        seed,
        ..GenerateOptions::default()
    })
}

#[test]
fn same_seed_gives_identical_dataset() {
    let config = small_config();
    let catalogs = catalogs();

    let first = engine(7).generate(&config, &catalogs).expect("first run");
    let second = engine(7).generate(&config, &catalogs).expect("second run");

    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.report.tables, second.report.tables);
}

#[test]
fn different_seeds_diverge() {
    let config = small_config();
    let catalogs = catalogs();

    let first = engine(1).generate(&config, &catalogs).expect("first run");
    let second = engine(2).generate(&config, &catalogs).expect("second run");

    assert_ne!(first.dataset, second.dataset);
}

#[test]
fn generated_dataset_passes_every_check() {
    let config = small_config();
    let generated = engine(11)
        .generate(&config, &catalogs())
        .expect("generate");

    let issues = check_dataset(&generated.dataset, &config.rental);
    assert!(issues.is_empty(), "issues: {issues:?}");
    assert_eq!(generated.dataset.len(), TableName::ALL.len());
    for table in [
        TableName::Staff,
        TableName::Sales,
        TableName::Rental,
        TableName::Invoices,
        TableName::Payments,
        TableName::Customers,
    ] {
        assert!(
            generated.report.rows(table).unwrap_or(0) > 0,
            "{table} should not be empty"
        );
    }
}

#[test]
fn exactly_one_manager_is_employed() {
    let generated = engine(3)
        .generate(&small_config(), &catalogs())
        .expect("generate");
    let staff = generated.dataset.get(TableName::Staff).expect("staff table");

    let managers = staff
        .column("is_manager")
        .filter(|value| **value == Value::Bool(true))
        .count();
    assert_eq!(managers, 1);
}

#[test]
fn brackets_match_participation_counts() {
    let generated = engine(5)
        .generate(&small_config(), &catalogs())
        .expect("generate");
    let dataset = &generated.dataset;
    let tournaments = dataset.get(TableName::Tournaments).expect("tournaments");
    let participations = dataset
        .get(TableName::Participations)
        .expect("participations");

    let mut seats: BTreeMap<i64, u64> = BTreeMap::new();
    for id in participations.column("tournament_id").filter_map(Value::as_int) {
        *seats.entry(id).or_default() += 1;
    }

    assert!(!tournaments.is_empty());
    for (id, matches) in tournaments
        .column("tournament_id")
        .zip(tournaments.column("matches"))
    {
        let id = id.as_int().expect("tournament id");
        let matches = matches.as_int().expect("matches") as u64;
        assert!((matches + 1).is_power_of_two(), "tournament {id}: {matches}");
        let leaves = (matches + 1) / 2;
        let taken = seats.get(&id).copied().unwrap_or(0);
        assert!(taken > 0 && taken % leaves == 0, "tournament {id}: {taken} seats");
    }
}

#[test]
fn fail_policy_aborts_when_rental_stock_runs_out() {
    let mut config = small_config();
    config.inventory.rental_games_n = 1;
    config.inventory.inactive_rental_games = 0;
    config.rental.unmatched = UnmatchedRentalPolicy::Fail;

    let err = engine(9)
        .generate(&config, &catalogs())
        .expect_err("rentals should run out");
    assert!(matches!(err, GenerationError::Invariant(_)), "{err}");
}

#[test]
fn drop_policy_counts_unmatched_visits() {
    let mut config = small_config();
    config.inventory.rental_games_n = 1;
    config.inventory.inactive_rental_games = 0;

    let generated = engine(9).generate(&config, &catalogs()).expect("generate");
    assert!(generated.report.dropped_rental_visits > 0);
    assert!(
        generated
            .report
            .warnings
            .iter()
            .any(|issue| issue.code == "unmatched_rental_visits")
    );
}

#[test]
fn invalid_config_is_rejected_before_generation() {
    let mut config = small_config();
    config.hours.open = 22;
    config.hours.close = 10;

    let err = engine(1)
        .generate(&config, &catalogs())
        .expect_err("invalid hours");
    assert_eq!(err.code(), "config_error");
}

#[test]
fn run_writes_every_table_and_a_report() {
    let out_dir = temp_out_dir("run_tables");
    let engine = GenerationEngine::new(GenerateOptions {
        out_dir,
        seed: 21,
        ..GenerateOptions::default()
    });

    let result = engine.run(&small_config(), &catalogs()).expect("run");

    for table in TableName::ALL {
        let path = result.run_dir.join(format!("{table}.csv"));
        let contents = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing {}", path.display()));
        let header = contents.lines().next().expect("header line");
        assert!(header.starts_with(table.schema().primary_key()), "{table}: {header}");
    }

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(result.run_dir.join("generation_report.json"))
            .expect("read generation_report.json"),
    )
    .expect("parse report");
    assert_eq!(
        report.get("seed").and_then(|value| value.as_u64()),
        Some(21)
    );
    assert_eq!(
        report
            .get("tables")
            .and_then(|value| value.as_array())
            .map(Vec::len),
        Some(TableName::ALL.len())
    );
    assert!(report.get("failure").is_none());
    assert!(result.report.bytes_written > 0);
}

#[test]
fn failed_run_still_writes_its_report() {
    let mut config = small_config();
    config.inventory.rental_games_n = 1;
    config.inventory.inactive_rental_games = 0;
    config.rental.unmatched = UnmatchedRentalPolicy::Fail;

    let out_dir = temp_out_dir("run_failure");
    let engine = GenerationEngine::new(GenerateOptions {
        out_dir: out_dir.clone(),
        seed: 9,
        ..GenerateOptions::default()
    });
    engine.run(&config, &catalogs()).expect_err("run should fail");

    let run_dir = fs::read_dir(&out_dir)
        .expect("read out dir")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .next()
        .expect("run dir");
    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(run_dir.join("generation_report.json")).expect("read report"),
    )
    .expect("parse report");
    assert_eq!(
        report
            .pointer("/failure/code")
            .and_then(|value| value.as_str()),
        Some("generation_invariant_error")
    );
    assert!(!run_dir.join("sales.csv").exists());
}

fn temp_out_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "dragonfill_generate_{label}_{}",
        uuid::Uuid::new_v4()
    ));
    fs::create_dir_all(&dir).expect("create temp out dir");
    dir
}
