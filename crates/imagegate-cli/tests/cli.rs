//! Argument handling and `imagegate explain`.

mod common;

use common::{Sandbox, imagegate_cmd};
use predicates::prelude::*;

#[test]
fn help_works() {
    imagegate_cmd().arg("--help").assert().success();
}

#[test]
fn subcommand_help_lists_gate_flags() {
    imagegate_cmd()
        .args(["gate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--include-all"))
        .stdout(predicate::str::contains("--run-bundle"))
        .stdout(predicate::str::contains("--usetag"));
}

#[test]
fn version_works() {
    imagegate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("imagegate"));
}

#[test]
fn json_and_markdown_conflict() {
    imagegate_cmd()
        .args(["--json", "--markdown", "audit", "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn bundle_sources_conflict() {
    imagegate_cmd()
        .args(["gate", "--run-bundle", "--bundlefile", "b.json"])
        .assert()
        .failure();
}

#[test]
fn explain_gate() {
    imagegate_cmd()
        .args(["explain", "suiddiff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUIDFILEADD"))
        .stdout(predicate::str::contains("Remediation"));
}

#[test]
fn explain_trigger_lists_parameters() {
    imagegate_cmd()
        .args(["explain", "PKGDIFF:PKGADD"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PKGDIFF:PKGADD"))
        .stdout(predicate::str::contains("ALLOWED"));
}

#[test]
fn explain_unknown_lists_what_exists() {
    imagegate_cmd()
        .args(["explain", "NOPE"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown gate or trigger: NOPE"))
        .stderr(predicate::str::contains("DOCKERFILECHECK"));
}

#[test]
fn explain_unknown_trigger_lists_the_gate_triggers() {
    imagegate_cmd()
        .args(["explain", "SUIDDIFF:NOPE"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("SUIDDIFF:SUIDFILEDEL"));
}

#[test]
fn missing_home_and_data_dir_is_a_hard_error() {
    let sb = Sandbox::empty();
    sb.cmd()
        .env_remove("HOME")
        .env_remove("IMAGEGATE_DATA_DIR")
        .args(["audit", "report"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("IMAGEGATE_DATA_DIR"));
}
