//! CLI integration tests for tdserver-admin.
//!
//! These tests verify command-line argument parsing, help output,
//! offline type mapping and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the tdserver-admin binary.
fn cmd() -> Command {
    Command::cargo_bin("tdserver-admin").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("drop"))
        .stdout(predicate::str::contains("exists"))
        .stdout(predicate::str::contains("has-tables"))
        .stdout(predicate::str::contains("map-type"));
}

#[test]
fn test_create_subcommand_help() {
    cmd()
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--if-not-exists"));
}

#[test]
fn test_drop_subcommand_help() {
    cmd()
        .args(["drop", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--if-exists"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tdserver-admin"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

// =============================================================================
// Type Mapping Tests (no configuration or connection)
// =============================================================================

#[test]
fn test_map_type_int() {
    cmd()
        .args(["map-type", "--type", "int"])
        .assert()
        .success()
        .stdout("int\n");
}

#[test]
fn test_map_type_bounded_ansi_string() {
    cmd()
        .args(["map-type", "--type", "string", "--max-length", "100", "--unicode", "false"])
        .assert()
        .success()
        .stdout("varchar(100)\n");
}

#[test]
fn test_map_type_store_type_with_facets() {
    cmd()
        .args(["map-type", "--store-type", "decimal(10,3)"])
        .assert()
        .success()
        .stdout("decimal(10, 3)\n");
}

#[test]
fn test_map_type_json_output() {
    cmd()
        .args(["--output-json", "map-type", "--type", "decimal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"store_type\": \"decimal(18, 2)\""))
        .stdout(predicate::str::contains("\"precision\": 18"));
}

#[test]
fn test_map_type_ignores_missing_config() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "map-type", "--type", "Guid"])
        .assert()
        .success()
        .stdout("byte(16)\n");
}

#[test]
fn test_map_type_unknown_type_exits_with_code_1() {
    cmd()
        .args(["map-type", "--type", "NoSuchType"])
        .assert()
        .code(1);
}

#[test]
fn test_map_type_without_type_exits_with_code_1() {
    cmd()
        .arg("map-type")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--type or --store-type"));
}

#[test]
fn test_map_type_unqualified_varchar_exits_with_code_1() {
    cmd()
        .args(["map-type", "--store-type", "varchar"])
        .assert()
        .code(1);
}

// =============================================================================
// Exit Code Tests - Config Errors (Exit Code 1)
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "exists"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "exists"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "has-tables"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_host_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  host: \"\"").unwrap();
    writeln!(file, "  user: dbadmin").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "create"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("connection.host is required"));
}

#[test]
fn test_drop_without_database_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  host: localhost").unwrap();
    writeln!(file, "  user: dbadmin").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "drop"])
        .assert()
        .code(1);
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
