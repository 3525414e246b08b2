//! CLI output integration tests.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn whalewatch() -> Command {
    cargo_bin_cmd!("whalewatch")
}

#[test]
fn test_help() {
    whalewatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("whalewatch"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version() {
    whalewatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("whalewatch"));
}

#[test]
fn test_run_help_mentions_config() {
    whalewatch()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_check_help_mentions_validation() {
    whalewatch()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validate"));
}

#[test]
fn test_missing_subcommand_is_rejected() {
    whalewatch()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
