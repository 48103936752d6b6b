//! Conformance tests for imagegate.
//!
//! These tests validate:
//! 1. Every gate has an explanation and every trigger a description
//! 2. Fixture bundles and analysis reports validate against their generated schemas
//! 3. JSON emitted by the CLI validates against the report schemas

mod common;

use common::{APP, BROKEN, Sandbox, fixture, stdout_json};
use imagegate_types::{AnalysisReport, AuditReport, BundleDocument, GateReport, explain};
use serde_json::Value;
use walkdir::WalkDir;

fn validator(schema: schemars::Schema) -> jsonschema::Validator {
    let value = serde_json::to_value(&schema).expect("schema serializes");
    jsonschema::validator_for(&value).expect("schema compiles")
}

fn assert_valid(validator: &jsonschema::Validator, instance: &Value, what: &str) {
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect();
    assert!(errors.is_empty(), "{what} violates its schema: {errors:#?}");
}

#[test]
fn every_gate_has_an_explanation() {
    for gate in explain::all_gate_names() {
        let exp = explain::lookup_explanation(gate)
            .unwrap_or_else(|| panic!("gate '{gate}' has no explanation"));
        assert!(!exp.title.is_empty(), "gate '{gate}' has empty title");
        assert!(!exp.description.is_empty(), "gate '{gate}' has empty description");
        assert!(!exp.remediation.is_empty(), "gate '{gate}' has empty remediation");
    }
}

#[test]
fn fixture_bundles_match_the_bundle_schema() {
    let v = validator(schemars::schema_for!(BundleDocument));
    for name in ["site.json", "unknown-policy.json"] {
        let text = std::fs::read_to_string(fixture("bundles").join(name)).expect("read bundle");
        let value: Value = serde_json::from_str(&text).expect("bundle is JSON");
        assert_valid(&v, &value, name);
    }
}

#[test]
fn fixture_reports_match_the_analysis_schema() {
    let v = validator(schemars::schema_for!(AnalysisReport));
    let mut seen = 0;
    for entry in WalkDir::new(fixture("datadir")) {
        let entry = entry.expect("walk fixtures");
        if entry.file_name() != "analysis_report.json" {
            continue;
        }
        let text = std::fs::read_to_string(entry.path()).expect("read report");
        let value: Value = serde_json::from_str(&text).expect("report is JSON");
        assert_valid(&v, &value, &entry.path().display().to_string());
        seen += 1;
    }
    assert_eq!(seen, 3);
}

#[test]
fn gate_report_output_matches_schema() {
    let sb = Sandbox::new();
    sb.add_corrupt_report(BROKEN);
    let output = sb
        .cmd()
        .args(["--json", "gate", "--include-all", "--show-whitelisted", "--bundlefile"])
        .arg(fixture("bundles/site.json"))
        .output()
        .expect("run");
    let report = stdout_json(&output);
    assert_eq!(report["verdict"]["failed"], 1);
    assert_valid(
        &validator(schemars::schema_for!(GateReport)),
        &report,
        "gate report",
    );
}

#[test]
fn audit_report_output_matches_schema() {
    let sb = Sandbox::new();
    sb.cmd().args(["gate", "--image", APP]).assert().code(2);
    let output = sb
        .cmd()
        .args(["--json", "audit", "report"])
        .output()
        .expect("run");
    assert_valid(
        &validator(schemars::schema_for!(AuditReport)),
        &stdout_json(&output),
        "audit report",
    );
}

#[test]
fn synced_bundle_cache_matches_schema() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["policybundle", "sync", "--infile"])
        .arg(fixture("bundles/site.json"))
        .assert()
        .success();
    let text = std::fs::read_to_string(sb.bundle_cache()).expect("read cache");
    let value: Value = serde_json::from_str(&text).expect("cache is JSON");
    assert_valid(
        &validator(schemars::schema_for!(BundleDocument)),
        &value,
        "bundle cache",
    );
}
