//! Integration tests for the cyclecal binary.
//!
//! These tests verify end-to-end behavior including:
//! - Profile setup and validation
//! - Day and range edits
//! - Forecast, status and calendar output
//! - CSV export and the edit journal

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI bound to `data_dir`, isolated from the user's config
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cyclecal"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

/// Number of day records in the store document
fn stored_days(data_dir: &Path) -> usize {
    let contents = fs::read_to_string(data_dir.join("cycle.json")).expect("Failed to read store");
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    value["events"].as_array().map_or(0, |events| events.len())
}

/// Two recorded periods 30 days apart
fn record_two_periods(data_dir: &Path) {
    cli(data_dir)
        .args(["range", "2024-01-01", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 5 days"));
    cli(data_dir)
        .args(["range", "2024-01-31", "2024-02-04"])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Menstrual cycle tracker"));
}

#[test]
fn test_status_without_history_suggests_setup() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No period history yet"));

    // Reading never creates the store
    assert!(!temp_dir.path().join("cycle.json").exists());
}

#[test]
fn test_setup_marks_period_and_drives_status() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["setup", "--cycle-length", "28", "--period-length", "5"])
        .args(["--period-start", "2024-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile saved"));

    assert_eq!(stored_days(data_dir), 5);

    cli(data_dir)
        .args(["status", "--today", "2024-01-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cycle length:  28 days (profile)"))
        .stdout(predicate::str::contains("Cycle day:     10"))
        .stdout(predicate::str::contains("Next period:   2024-01-29 (in 19 days)"));
}

#[test]
fn test_setup_validation_writes_nothing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // Cycle shorter than 21 days
    cli(data_dir)
        .args(["setup", "--cycle-length", "20", "--period-length", "5"])
        .args(["--period-start", "2024-01-01"])
        .assert()
        .failure();

    // Period longer than the cycle
    cli(data_dir)
        .args(["setup", "--cycle-length", "28", "--period-length", "30"])
        .assert()
        .failure();

    assert!(!data_dir.join("cycle.json").exists());
    assert!(!data_dir.join("journal.jsonl").exists());
}

#[test]
fn test_invalid_date_rejected() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["toggle", "2024-02-30"])
        .assert()
        .failure();
}

#[test]
fn test_toggle_cycles_day_state() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["toggle", "2024-03-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-01: period"));

    // Pregnancy replaces the period flag
    cli(data_dir)
        .args(["pregnancy", "2024-03-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-01: pregnancy"));
    assert_eq!(stored_days(data_dir), 1);

    cli(data_dir)
        .args(["pregnancy", "2024-03-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-01: cleared"));
    assert_eq!(stored_days(data_dir), 0);
}

#[test]
fn test_range_clear() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    record_two_periods(data_dir);
    assert_eq!(stored_days(data_dir), 10);

    // Reversed bounds cover the same days
    cli(data_dir)
        .args(["range", "2024-02-04", "2024-01-31", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 5 days"));
    assert_eq!(stored_days(data_dir), 5);
}

#[test]
fn test_forecast_json() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    record_two_periods(data_dir);

    let output = cli(data_dir)
        .args(["forecast", "--today", "2024-02-10", "--until", "2024-04-30", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).expect("forecast is JSON");
    assert_eq!(value["next_period_start"], "2024-03-01");
    assert_eq!(value["cycle_length"], 30);
    assert_eq!(value["period_length"], 5);
    assert_eq!(value["current_cycle_day"], 11);

    let periods = value["predicted_period_days"].as_array().unwrap();
    assert_eq!(periods.first().unwrap(), "2024-03-01");
    assert!(periods.iter().all(|d| d.as_str().unwrap() <= "2024-04-30"));
    assert!(value["ovulation_days"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("2024-03-14")));
}

#[test]
fn test_forecast_text_groups_windows() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    record_two_periods(data_dir);

    cli(data_dir)
        .args(["forecast", "--today", "2024-02-10", "--until", "2024-03-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next period: 2024-03-01"))
        .stdout(predicate::str::contains("period     2024-03-01 .. 2024-03-05"))
        .stdout(predicate::str::contains("fertile    2024-03-09 .. 2024-03-15"))
        .stdout(predicate::str::contains("ovulation  2024-03-14"));
}

#[test]
fn test_forecast_empty_history() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["forecast", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"next_period_start\": null"));
}

#[test]
fn test_calendar_month() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    record_two_periods(data_dir);

    cli(data_dir)
        .args(["calendar", "--month", "2024-03", "--today", "2024-02-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("March 2024"))
        .stdout(predicate::str::contains(" Mo  Tu  We  Th  Fr  Sa  Su"))
        .stdout(predicate::str::contains("  1~"))
        .stdout(predicate::str::contains(" 14O"));

    cli(data_dir)
        .args(["calendar", "--month", "2024-13"])
        .assert()
        .failure();
}

#[test]
fn test_export_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    record_two_periods(data_dir);

    let csv_path = data_dir.join("export").join("cycle.csv");
    cli(data_dir)
        .arg("export")
        .arg("--out")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 10 days"));

    let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert!(csv_content.starts_with("date,day_key,is_period,is_pregnancy"));
    assert_eq!(csv_content.lines().count(), 11);
    assert!(csv_content.contains("2024-01-31,"));
}

#[test]
fn test_journal_lists_edits() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    record_two_periods(data_dir);
    cli(data_dir).args(["toggle", "2024-02-20"]).assert().success();

    cli(data_dir)
        .arg("journal")
        .assert()
        .success()
        .stdout(predicate::str::contains("mark range 2024-01-01 .. 2024-01-05 (5 changes)"))
        .stdout(predicate::str::contains("toggle period 2024-02-20 (1 changes)"));

    let output = cli(data_dir)
        .args(["journal", "--limit", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&output);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("toggle period 2024-02-20"));
}

#[test]
fn test_config_file_policy() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    record_two_periods(data_dir);

    let config_path = data_dir.join("custom.toml");
    fs::write(&config_path, "[forecast]\nluteal_phase_days = 14\n").unwrap();

    cli(data_dir)
        .arg("--config")
        .arg(&config_path)
        .args(["forecast", "--today", "2024-02-10", "--until", "2024-03-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ovulation  2024-03-17"));

    fs::write(&config_path, "[forecast]\nmin_cycles = 0\n").unwrap();
    cli(data_dir)
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .failure();
}
