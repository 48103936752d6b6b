//! Developer tasks (schema generation, fixture conformance, explain coverage).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use imagegate_domain::GateRegistry;
use imagegate_test_util::{copy_tree, normalize_nondeterministic};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the project root (parent of xtask directory).
fn project_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    if manifest_dir.ends_with("xtask") {
        manifest_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(manifest_dir)
    } else {
        manifest_dir
    }
}

fn schemas_dir() -> PathBuf {
    project_root().join("schemas")
}

fn fixtures_dir() -> PathBuf {
    project_root().join("tests").join("fixtures")
}

/// Schema definition with its target filename.
struct SchemaSpec {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn generate_gate_report_schema() -> schemars::Schema {
    schema_for!(imagegate_types::GateReport)
}

fn generate_audit_report_schema() -> schemars::Schema {
    schema_for!(imagegate_types::AuditReport)
}

fn generate_bundle_schema() -> schemars::Schema {
    schema_for!(imagegate_types::BundleDocument)
}

fn generate_analysis_report_schema() -> schemars::Schema {
    schema_for!(imagegate_types::AnalysisReport)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(imagegate_settings::ImagegateConfigV1)
}

const GATE_REPORT_SCHEMA: &str = "imagegate.gate_report.v1.json";
const AUDIT_REPORT_SCHEMA: &str = "imagegate.audit_report.v1.json";
const BUNDLE_SCHEMA: &str = "imagegate.bundle.v1.json";
const ANALYSIS_REPORT_SCHEMA: &str = "imagegate.analysis_report.v1.json";

fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            filename: GATE_REPORT_SCHEMA,
            generate: generate_gate_report_schema,
        },
        SchemaSpec {
            filename: AUDIT_REPORT_SCHEMA,
            generate: generate_audit_report_schema,
        },
        SchemaSpec {
            filename: BUNDLE_SCHEMA,
            generate: generate_bundle_schema,
        },
        SchemaSpec {
            filename: ANALYSIS_REPORT_SCHEMA,
            generate: generate_analysis_report_schema,
        },
        SchemaSpec {
            filename: "imagegate.config.v1.json",
            generate: generate_config_schema,
        },
    ]
}

fn spec(filename: &str) -> anyhow::Result<SchemaSpec> {
    schema_specs()
        .into_iter()
        .find(|s| s.filename == filename)
        .with_context(|| format!("unknown schema {filename}"))
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

fn compile(filename: &str) -> anyhow::Result<jsonschema::Validator> {
    let schema = (spec(filename)?.generate)();
    let value = serde_json::to_value(&schema).context("Failed to serialize schema")?;
    jsonschema::validator_for(&value)
        .map_err(|e| anyhow::anyhow!("Failed to compile {filename}: {e}"))
}

/// Emit schemas to the schemas/ directory.
fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create schemas directory")?;
    }

    for spec in schema_specs() {
        let schema = (spec.generate)();
        let json = serialize_schema(&schema)?;
        let path = dir.join(spec.filename);

        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;

        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Check that schemas/ matches what would be generated.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for spec in schema_specs() {
        let path = dir.join(spec.filename);
        if !path.exists() {
            missing.push(spec.filename);
            continue;
        }

        let expected = serialize_schema(&(spec.generate)())?;
        let actual = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if expected != actual {
            mismatched.push(spec.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }
    if !missing.is_empty() {
        eprintln!("Missing schemas:");
        for name in &missing {
            eprintln!("  - {name}");
        }
    }
    if !mismatched.is_empty() {
        eprintln!("Schemas out of date:");
        for name in &mismatched {
            eprintln!("  - {name}");
        }
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Validate fixture bundles and analysis reports against schemas");
    eprintln!("  conform-full      conform + validate imagegate binary output against schemas");
    eprintln!("  explain-coverage  Check every gate and trigger is documented");
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {} as JSON", path.display()))
}

fn check(
    validator: &jsonschema::Validator,
    value: &serde_json::Value,
    label: &str,
    errors: &mut Vec<String>,
) {
    for err in validator.iter_errors(value) {
        errors.push(format!("{label}: schema validation: {err}"));
    }
}

fn report_errors(errors: &[String], what: &str) -> anyhow::Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    eprintln!("\nConformance errors:");
    for err in errors {
        eprintln!("  - {err}");
    }
    bail!("{what} failed with {} errors", errors.len())
}

/// Fixture bundles and analysis reports must match the schemas the engine publishes.
fn conform() -> anyhow::Result<()> {
    let bundles = compile(BUNDLE_SCHEMA)?;
    let reports = compile(ANALYSIS_REPORT_SCHEMA)?;
    let mut errors = Vec::new();
    let mut count = 0;

    let bundle_dir = fixtures_dir().join("bundles");
    for entry in fs::read_dir(&bundle_dir)
        .with_context(|| format!("Failed to read {}", bundle_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        check(&bundles, &read_json(&path)?, &path.display().to_string(), &mut errors);
        count += 1;
    }

    let data_dir = fixtures_dir().join("datadir").join("data");
    for entry in fs::read_dir(&data_dir)
        .with_context(|| format!("Failed to read {}", data_dir.display()))?
    {
        let path = entry?.path().join("analysis_report.json");
        if !path.is_file() {
            continue;
        }
        let value = read_json(&path)?;
        check(&reports, &value, &path.display().to_string(), &mut errors);

        // The directory name is the image id; a mismatch is read as corruption.
        let dir_id = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if value.get("image_id").and_then(|v| v.as_str()) != Some(dir_id.as_str()) {
            errors.push(format!(
                "{}: image_id does not match its directory",
                path.display()
            ));
        }
        count += 1;
    }

    if count == 0 {
        bail!("No JSON fixtures found in {}", fixtures_dir().display());
    }
    report_errors(&errors, "Conformance validation")?;
    println!("✓ All {count} fixtures pass conformance checks");
    Ok(())
}

/// `conform`, then run the built binary on a copy of the fixture data and validate its output.
fn conform_full() -> anyhow::Result<()> {
    conform()?;

    println!("\n--- Full conformance: imagegate binary output ---\n");

    let bin = project_root().join("target").join("debug").join("imagegate");
    #[cfg(target_os = "windows")]
    let bin = bin.with_extension("exe");
    if !bin.exists() {
        bail!(
            "imagegate binary not found at {}.\n\
            Run `cargo build -p imagegate-cli` first.",
            bin.display()
        );
    }

    let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
    copy_tree(&fixtures_dir().join("datadir"), temp_dir.path())
        .context("Failed to copy fixture data dir")?;

    let run = |args: &[&str]| -> anyhow::Result<serde_json::Value> {
        let output = std::process::Command::new(&bin)
            .args(args)
            .current_dir(temp_dir.path())
            .env("IMAGEGATE_DATA_DIR", temp_dir.path())
            .output()
            .with_context(|| format!("Failed to run imagegate {}", args.join(" ")))?;
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "imagegate {} did not print JSON (exit {:?}): {}",
                args.join(" "),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            )
        })?;
        Ok(normalize_nondeterministic(value))
    };

    let mut errors = Vec::new();
    let gate = run(&["--json", "gate", "--include-all", "--show-whitelisted"])?;
    check(&compile(GATE_REPORT_SCHEMA)?, &gate, "gate report", &mut errors);
    let audit = run(&["--json", "audit", "report"])?;
    check(&compile(AUDIT_REPORT_SCHEMA)?, &audit, "audit report", &mut errors);

    let evaluated = gate["verdict"]["evaluated"].as_u64().unwrap_or(0);
    let rows = audit["rows"].as_array().map(Vec::len).unwrap_or(0);
    if evaluated as usize != rows {
        errors.push(format!(
            "gate evaluated {evaluated} images but audit lists {rows}"
        ));
    }

    report_errors(&errors, "Full conformance")?;
    println!("✓ gate and audit output validate against their schemas");
    Ok(())
}

/// Every gate needs an explanation; every trigger and parameter a description.
fn explain_coverage() -> anyhow::Result<()> {
    let registry = GateRegistry::builtin();
    let mut errors = Vec::new();
    let mut triggers = 0;

    for gate in imagegate_types::all_gate_names() {
        match imagegate_types::lookup_explanation(gate) {
            Some(exp) => {
                if exp.title.is_empty() {
                    errors.push(format!("Gate '{gate}' has empty title"));
                }
                if exp.description.is_empty() {
                    errors.push(format!("Gate '{gate}' has empty description"));
                }
                if exp.remediation.is_empty() {
                    errors.push(format!("Gate '{gate}' has empty remediation"));
                }
            }
            None => errors.push(format!("Gate '{gate}' has no explanation")),
        }
    }

    for (gate, spec) in registry.iter() {
        let gate = gate.name();
        triggers += 1;
        if spec.description.is_empty() {
            errors.push(format!("Trigger '{gate}:{}' has no description", spec.name));
        }
        for param in spec.params {
            if param.description.is_empty() || param.example.is_empty() {
                errors.push(format!(
                    "Parameter '{}' of '{gate}:{}' is undocumented",
                    param.name, spec.name
                ));
            }
        }
    }

    report_errors(&errors, "Explain coverage validation")?;
    println!(
        "✓ {} gates and {triggers} triggers are documented",
        imagegate_types::all_gate_names().len()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "conform-full" => conform_full(),
        "explain-coverage" => explain_coverage(),
        "print-schema-ids" => {
            for spec in schema_specs() {
                println!("{}", spec.filename.trim_end_matches(".json"));
            }
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
