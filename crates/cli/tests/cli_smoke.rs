//! CLI smoke tests for drydock.
//!
//! These tests verify argument parsing, flag validation, and the commands
//! that do not shell out to kpt.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the drydock binary.
fn drydock_cmd() -> Command {
  cargo_bin_cmd!("drydock")
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  drydock_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  drydock_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("drydock"));
}

#[test]
fn subcommand_help_works() {
  for sub in ["render", "deploy", "destroy", "deps"] {
    drydock_cmd()
      .args([sub, "--help"])
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// Deps
// =============================================================================

#[test]
fn deps_lists_configuration_files() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("foo.yaml"), "kind: Deployment\n").unwrap();
  std::fs::write(temp.path().join("bar.yml"), "kind: Service\n").unwrap();
  std::fs::write(temp.path().join("README.md"), "docs\n").unwrap();

  drydock_cmd()
    .current_dir(temp.path())
    .arg("deps")
    .assert()
    .success()
    .stdout(predicate::str::contains("foo.yaml"))
    .stdout(predicate::str::contains("bar.yml"))
    .stdout(predicate::str::contains("README.md").not());
}

#[test]
fn deps_json_format_works() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("foo.yaml"), "kind: Deployment\n").unwrap();

  drydock_cmd()
    .current_dir(temp.path())
    .args(["deps", "--format", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("foo.yaml"))
    .stdout(predicate::str::starts_with("["));
}

#[test]
fn deps_missing_dir_fails() {
  let temp = TempDir::new().unwrap();

  drydock_cmd()
    .current_dir(temp.path())
    .args(["deps", "--dir", "no-such-dir"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found"));
}

// =============================================================================
// Flag validation
// =============================================================================

#[test]
fn render_rejects_fn_path_and_fn_image_together() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("foo.yaml"), "kind: Deployment\n").unwrap();

  drydock_cmd()
    .current_dir(temp.path())
    .args([
      "render",
      "--fn-path",
      "fns/",
      "--fn-image",
      "gcr.io/example/fn:v1",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("only one of"));
}

#[test]
fn bad_label_flag_fails_at_parse_time() {
  drydock_cmd()
    .args(["render", "--label", "notakeyvalue"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("key=value"));
}

#[test]
fn bad_duration_flag_fails_at_parse_time() {
  drydock_cmd()
    .args(["deploy", "--poll-period", "soon"])
    .assert()
    .failure();
}
