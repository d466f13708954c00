// file: tests/cli.rs
// version: 1.0.0
// guid: a0d3f5c7-1e92-4b68-8c4f-3927e6b1d05a

//! Command line surface: help, version, grammar and exit codes

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn znx(config_dir: &TempDir) -> Command {
    let config = config_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = Command::cargo_bin("znx").unwrap();
    cmd.env("ZNX_CONFIG", &config).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("revert"));
}

#[test]
fn test_short_v_prints_version() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir)
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_command_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir).assert().code(1);
}

#[test]
fn test_unknown_command_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir).args(["frobnicate", "/dev/sdb"]).assert().code(1);
}

#[test]
fn test_wrong_arity_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir).args(["update", "/dev/sdb"]).assert().code(1);
    znx(&temp_dir)
        .args(["list", "/dev/sdb", "nitrux/nx"])
        .assert()
        .code(1);
    znx(&temp_dir)
        .args(["deploy", "/dev/sdb", "nitrux/nx"])
        .assert()
        .code(1);
}

#[test]
fn test_malformed_image_name_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir)
        .args(["revert", "/dev/sdb", "nitrux"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nitrux"));
}

#[test]
fn test_regular_file_is_not_a_device() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_device = temp_dir.path().join("disk.img");
    std::fs::write(&not_a_device, b"").unwrap();

    znx(&temp_dir)
        .arg("list")
        .arg(&not_a_device)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("znx: error:"))
        .stderr(predicate::str::contains("is not a block device"));
}

#[test]
fn test_unreadable_config_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    znx(&temp_dir)
        .args(["list", "/dev/sdb", "--config"])
        .arg(temp_dir.path().join("absent.toml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}
