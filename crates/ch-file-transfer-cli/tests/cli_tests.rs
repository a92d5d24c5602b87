//! CLI integration tests for ch-file-transfer.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes, and the file-preview path that needs no database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the ch-file-transfer binary.
fn cmd() -> Command {
    Command::cargo_bin("ch-file-transfer").unwrap()
}

/// Write a minimal valid configuration file.
fn valid_config() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  host: localhost").unwrap();
    file.flush().unwrap();
    file
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
        .stdout(predicate::str::contains("tables"))
        .stdout(predicate::str::contains("columns"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_export_subcommand_help() {
    cmd()
        .args(["export", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--columns"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--delimiter"));
}

#[test]
fn test_import_subcommand_help() {
    cmd()
        .args(["import", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--delimiter"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ch-file-transfer"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

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
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error (code 1), not a config error (code 2)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_preview_without_target_exits_with_code_2() {
    let config = valid_config();

    cmd()
        .args(["--config", config.path().to_str().unwrap(), "preview"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--table or --file"));
}

#[test]
fn test_preview_rejects_table_and_file_together() {
    let config = valid_config();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "preview",
            "--table",
            "t",
            "--file",
            "f.csv",
        ])
        .assert()
        .failure();
}

#[test]
fn test_bad_delimiter_is_rejected() {
    let config = valid_config();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "import",
            "data.csv",
            "t",
            "--delimiter",
            "abc",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("single byte"));
}

// =============================================================================
// File Preview (no database required)
// =============================================================================

#[test]
fn test_preview_file_infers_types() {
    let config = valid_config();
    let mut data = tempfile::NamedTempFile::new().unwrap();
    writeln!(data, "id,name,score").unwrap();
    writeln!(data, "1,alpha,0.5").unwrap();
    writeln!(data, "2,beta,1.25").unwrap();
    data.flush().unwrap();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "preview",
            "--file",
            data.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("id (Int64)"))
        .stdout(predicate::str::contains("name (String)"))
        .stdout(predicate::str::contains("score (Float64)"))
        .stdout(predicate::str::contains("alpha"));
}

#[test]
fn test_preview_file_json_output() {
    let config = valid_config();
    let mut data = tempfile::NamedTempFile::new().unwrap();
    writeln!(data, "a,b").unwrap();
    writeln!(data, "1,x").unwrap();
    data.flush().unwrap();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--output-json",
            "preview",
            "--file",
            data.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"columns\""))
        .stdout(predicate::str::contains("\"rows\""));
}

#[test]
fn test_preview_missing_file_fails() {
    let config = valid_config();

    cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "preview",
            "--file",
            "no_such_file.csv",
        ])
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
