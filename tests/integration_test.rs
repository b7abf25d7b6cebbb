//! Integration tests for the reconciler CLI.
//!
//! These tests run the actual binary and verify the report files against
//! expected CSV files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Run the binary on the sample exports, with extra args, and return stdout
fn run_recon(output_dir: &Path, extra: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("expense-recon").unwrap();
    let assert = cmd
        .arg("--bank")
        .arg(test_data_path("bank.csv"))
        .arg("--certify")
        .arg(test_data_path("certify.csv"))
        .arg("--output-dir")
        .arg(output_dir)
        .args(extra)
        .assert()
        .success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

/// Normalize CSV for comparison (sort lines, trim whitespace)
fn normalize_csv(csv: &str) -> Vec<String> {
    let mut lines: Vec<String> = csv
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    // Keep header first, sort the rest
    if lines.len() > 1 {
        let header = lines.remove(0);
        lines.sort();
        lines.insert(0, header);
    }

    lines
}

fn assert_report_matches(output_dir: &Path, report: &str, expected: &str) {
    let output = fs::read_to_string(output_dir.join(report)).unwrap();
    let expected = fs::read_to_string(test_data_path(expected)).unwrap();

    assert_eq!(normalize_csv(&output), normalize_csv(&expected), "{}", report);
}

#[test]
fn test_sample_reports() {
    let dir = TempDir::new().unwrap();
    run_recon(dir.path(), &[]);

    assert_report_matches(dir.path(), "matched_transactions.csv", "expected_matched.csv");
    assert_report_matches(dir.path(), "unmatched_bank.csv", "expected_unmatched_bank.csv");
    assert_report_matches(
        dir.path(),
        "unmatched_certify.csv",
        "expected_unmatched_certify.csv",
    );
}

#[test]
fn test_unmatched_reports_keep_original_columns() {
    let dir = TempDir::new().unwrap();
    run_recon(dir.path(), &[]);

    let output = fs::read_to_string(dir.path().join("unmatched_certify.csv")).unwrap();
    let mut lines = output.lines();
    assert_eq!(
        lines.next(),
        Some("Employee,USD Amt,Processed Date,Vendor,Expense Category,Notes")
    );
    assert_eq!(lines.next(), Some("Ann Lee,12.00,05/10/2024,Cafe,Meals,team lunch"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_matched_rows_sorted_by_last_name() {
    let dir = TempDir::new().unwrap();
    run_recon(dir.path(), &[]);

    let output = fs::read_to_string(dir.path().join("matched_transactions.csv")).unwrap();
    let names: Vec<&str> = output
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(names, vec!["JONES", "SMITH"]);
}

#[test]
fn test_summary_on_stdout() {
    let dir = TempDir::new().unwrap();
    let stdout = run_recon(dir.path(), &[]);

    assert!(stdout.contains("Matched Transactions: 2"));
    assert!(stdout.contains("Unmatched Bank Transactions: 2"));
    assert!(stdout.contains("Unmatched Certify Transactions: 1"));
}

#[test]
fn test_creates_nested_output_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("reports").join("may");
    run_recon(&nested, &[]);

    assert!(nested.join("matched_transactions.csv").exists());
}

#[test]
fn test_config_file_limits_split_matching() {
    let dir = TempDir::new().unwrap();
    let stdout = run_recon(dir.path(), &["--config", &test_data_path("no_splits.toml")]);

    assert!(stdout.contains("Matched Transactions: 1"));
    assert!(stdout.contains("Unmatched Bank Transactions: 4"));
}

#[test]
fn test_no_date_partition_flag() {
    // The LEE reversal pair shares a date, so the result is the same.
    let dir = TempDir::new().unwrap();
    let stdout = run_recon(dir.path(), &["--no-date-partition"]);

    assert!(stdout.contains("Unmatched Bank Transactions: 2"));
}

#[test]
fn test_invalid_config_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("expense-recon").unwrap();
    cmd.arg("--bank")
        .arg(test_data_path("bank.csv"))
        .arg("--certify")
        .arg(test_data_path("certify.csv"))
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--config")
        .arg(test_data_path("bad_tolerance.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("zero_sum.epsilon"));
}

#[test]
fn test_missing_file_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("expense-recon").unwrap();
    cmd.arg("--bank")
        .arg("nonexistent.csv")
        .arg("--certify")
        .arg(test_data_path("certify.csv"))
        .arg("--output-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_missing_argument_error() {
    let mut cmd = Command::cargo_bin("expense-recon").unwrap();
    cmd.arg("--bank")
        .arg(test_data_path("bank.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--certify"));
}

#[test]
fn test_wrong_export_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("expense-recon").unwrap();
    cmd.arg("--bank")
        .arg(test_data_path("certify.csv"))
        .arg("--certify")
        .arg(test_data_path("certify.csv"))
        .arg("--output-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required column"));
}
