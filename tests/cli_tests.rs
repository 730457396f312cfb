//! CLI integration tests
//!
//! Runs the `labcalc` binary with assert_cmd.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const STALE_CASE: &str = r#"tests:
  - id: lipid
    test_name: Lipid Profile
    parameters:
      - { name: HDL, value: "50", range_min: "40" }
      - { name: Total Cholesterol, value: "200" }
      - { name: Triglycerides, value: "150" }
      - name: LDL
        value: "99.00"
        is_calculated: true
        formula: "[Total Cholesterol] - [HDL] - ([Triglycerides] / 5)"
        range_max: "100"
"#;

fn labcalc() -> Command {
    Command::cargo_bin("labcalc").unwrap()
}

fn write_case(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    labcalc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("labcalc"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    labcalc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("labcalc"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CALCULATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_calculate_writes_back() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.yaml", STALE_CASE);

    labcalc()
        .arg("calculate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("120.00"));

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("120.00"));
    assert!(written.contains("indicator: high"));
    assert_eq!(
        fs::read_to_string(dir.path().join("case.yaml.bak")).unwrap(),
        STALE_CASE
    );
}

#[test]
fn test_calculate_dry_run_leaves_file() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.yaml", STALE_CASE);

    labcalc()
        .args(["calculate", "--dry-run"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    assert_eq!(fs::read_to_string(&path).unwrap(), STALE_CASE);
}

#[test]
fn test_calculate_missing_file_fails() {
    labcalc()
        .args(["calculate", "does-not-exist.yaml"])
        .assert()
        .failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_validate_detects_stale_value() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.yaml", STALE_CASE);

    labcalc()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("LDL"))
        .stdout(predicate::str::contains("99.00"));
}

#[test]
fn test_validate_passes_after_calculate() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.yaml", STALE_CASE);

    labcalc().arg("calculate").arg(&path).assert().success();

    labcalc()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("current"));
}

#[test]
fn test_validate_reports_broken_formula() {
    let dir = TempDir::new().unwrap();
    let path = write_case(
        &dir,
        "broken.yaml",
        r#"tests:
  - id: t
    test_name: T
    parameters:
      - { name: A, is_calculated: true, formula: "[B] +" }
"#,
    );

    labcalc()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("formula"));
}

#[test]
fn test_validate_warns_on_forward_reference() {
    let dir = TempDir::new().unwrap();
    let path = write_case(
        &dir,
        "forward.yaml",
        r#"tests:
  - id: t
    test_name: T
    parameters:
      - { name: X, value: "10" }
      - { name: A, value: "21.00", is_calculated: true, formula: "[B] + 1" }
      - { name: B, value: "20.00", is_calculated: true, formula: "[X] * 2" }
"#,
    );

    labcalc()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("calculated later"));
}

// ═══════════════════════════════════════════════════════════════════════════
// AUDIT AND EVAL
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_audit_shows_dependency_tree() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.yaml", STALE_CASE);

    labcalc()
        .arg("audit")
        .arg(&path)
        .args(["lipid", "LDL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dependency Tree"))
        .stdout(predicate::str::contains("Triglycerides"))
        .stdout(predicate::str::contains("stale"));
}

#[test]
fn test_audit_unknown_parameter_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_case(&dir, "case.yaml", STALE_CASE);

    labcalc()
        .arg("audit")
        .arg(&path)
        .args(["lipid", "VLDL"])
        .assert()
        .failure();
}

#[test]
fn test_eval_with_bindings() {
    labcalc()
        .args(["eval", "[TC] - [HDL] - ([TG] / 5)"])
        .args(["-s", "TC=200", "-s", "HDL=50", "-s", "TG=150"])
        .assert()
        .success()
        .stdout(predicate::str::contains("120.00"));
}

#[test]
fn test_eval_leading_minus() {
    labcalc()
        .args(["eval", "-2 * 3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-6.00"));
}

#[test]
fn test_eval_strict_missing_reference_fails() {
    labcalc()
        .args(["eval", "[Unknown] * 2", "--strict"])
        .assert()
        .failure();

    labcalc()
        .args(["eval", "[Unknown] * 2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.00"));
}

#[test]
fn test_eval_division_by_zero_fails() {
    labcalc().args(["eval", "1 / 0"]).assert().failure();
}
