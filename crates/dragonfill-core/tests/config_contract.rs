use std::fs;
use std::path::{Path, PathBuf};

use dragonfill_core::{
    BusinessConfig, ConfigError, ReferenceCatalogs, bundled_catalog_dir, validate_catalogs,
};
use schemars::schema_for;

fn repo_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/dragonfill.toml")
}

#[test]
fn shipped_config_matches_defaults() {
    let config = BusinessConfig::load(&repo_config_path()).expect("load shipped config");
    assert_eq!(config, BusinessConfig::default());
}

#[test]
fn bundled_catalogs_validate_against_defaults() {
    let catalogs = ReferenceCatalogs::bundled().expect("bundled catalogs");
    let report = validate_catalogs(&catalogs, &BusinessConfig::default());
    assert!(report.is_ok(), "catalog errors: {report}");
}

#[test]
fn skewed_city_probabilities_are_rejected() {
    let dir = temp_catalog_dir("skewed_cities");
    let cities = "city,probability\nWrocław,0.7\nOpole,0.2\n";
    fs::write(dir.join("cities.csv"), cities).expect("write cities");

    let catalogs = ReferenceCatalogs::load(&dir).expect("load catalogs");
    let report = validate_catalogs(&catalogs, &BusinessConfig::default());
    assert!(report.has_code("probability_sum"));
    assert!(report.errors.iter().any(|issue| issue.path == "cities.csv"));
}

#[test]
fn invalid_config_file_surfaces_issues() {
    let dir = temp_catalog_dir("bad_config");
    let path = dir.join("config.toml");
    fs::write(&path, "[hours]\nopen = 12\nclose = 10\n").expect("write config");

    match BusinessConfig::load(&path) {
        Err(ConfigError::Invalid(report)) => assert!(report.has_code("invalid_open_hours")),
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn json_schema_lists_every_section() {
    let schema = schema_for!(BusinessConfig);
    let json = serde_json::to_value(&schema).expect("serialize schema");
    let properties = json
        .get("properties")
        .and_then(|value| value.as_object())
        .expect("properties");

    for section in [
        "shop",
        "hours",
        "staff",
        "traffic",
        "customers",
        "inventory",
        "rental",
        "tournaments",
        "maintenance",
        "relationships",
    ] {
        assert!(properties.contains_key(section), "missing {section}");
    }
}

fn temp_catalog_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "dragonfill_core_{label}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    for entry in fs::read_dir(bundled_catalog_dir()).expect("read bundled catalogs") {
        let entry = entry.expect("dir entry");
        fs::copy(entry.path(), dir.join(entry.file_name())).expect("copy catalog");
    }
    dir
}
