use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("pitwall")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bot"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("pitwall")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("pitwall")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}

#[test]
fn test_missing_subcommand_fails() {
    cargo_bin_cmd!("pitwall").assert().failure();
}
