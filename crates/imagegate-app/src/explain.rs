//! The `explain` use case plus gate help and policy templates.

use imagegate_domain::{Gate, TriggerSpec};
use imagegate_types::explain::{self, Explanation};

#[derive(Clone, Debug)]
pub enum ExplainOutput {
    Gate {
        gate: Gate,
        explanation: Explanation,
    },
    Trigger {
        gate: Gate,
        spec: &'static TriggerSpec,
    },
    /// Unknown gate or trigger; lists what is available.
    NotFound {
        identifier: String,
        available: Vec<String>,
    },
}

/// Look up `GATE` or `GATE:TRIGGER` (case-insensitive).
pub fn run_explain(identifier: &str) -> ExplainOutput {
    let upper = identifier.trim().to_ascii_uppercase();
    let (gate_name, trigger_name) = match upper.split_once(':') {
        Some((g, t)) => (g, Some(t)),
        None => (upper.as_str(), None),
    };

    let not_found = |available: Vec<String>| ExplainOutput::NotFound {
        identifier: identifier.to_string(),
        available,
    };

    let Some(gate) = Gate::parse(gate_name) else {
        return not_found(
            explain::all_gate_names()
                .iter()
                .map(|g| g.to_string())
                .collect(),
        );
    };

    match trigger_name {
        None => match explain::lookup_explanation(gate.name()) {
            Some(explanation) => ExplainOutput::Gate { gate, explanation },
            None => not_found(Vec::new()),
        },
        Some(t) => match gate.triggers().iter().find(|s| s.name == t) {
            Some(spec) => ExplainOutput::Trigger { gate, spec },
            None => not_found(
                gate.triggers()
                    .iter()
                    .map(|s| format!("{}:{}", gate.name(), s.name))
                    .collect(),
            ),
        },
    }
}

/// Format a found explanation for terminal display. `NotFound` uses [`format_not_found`].
pub fn format_explanation(output: &ExplainOutput) -> String {
    match output {
        ExplainOutput::Gate { gate, explanation } => format_gate(*gate, explanation),
        ExplainOutput::Trigger { gate, spec } => format_trigger(*gate, spec),
        ExplainOutput::NotFound {
            identifier,
            available,
        } => format_not_found(identifier, available),
    }
}

fn format_gate(gate: Gate, exp: &Explanation) -> String {
    let mut out = String::new();
    let title = format!("{} ({})", exp.title, gate.name());
    out.push_str(&title);
    out.push('\n');
    out.push_str(&"=".repeat(title.len()));
    out.push_str("\n\n");
    out.push_str(exp.description);
    out.push_str("\n\nTriggers\n--------\n");
    for spec in gate.triggers() {
        out.push_str(&format!("  {}: {}\n", spec.name, spec.description));
    }
    out.push_str("\nRemediation\n-----------\n");
    out.push_str(exp.remediation);
    out.push_str("\n\nExamples\n--------\n");
    out.push_str("Before:\n");
    push_indented(&mut out, exp.examples.before);
    out.push_str("After:\n");
    push_indented(&mut out, exp.examples.after);
    out
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
}

fn format_trigger(gate: Gate, spec: &TriggerSpec) -> String {
    let mut out = format!("{}:{}\n\n{}\n", gate.name(), spec.name, spec.description);
    if spec.needs_base {
        out.push_str("\nCompares the image against its base image.\n");
    }
    if spec.params.is_empty() {
        out.push_str("\nParameters: none\n");
    } else {
        out.push_str("\nParameters:\n");
        for p in spec.params {
            out.push_str(&format!(
                "  {}: {} (e.g. {}={})\n",
                p.name, p.description, p.name, p.example
            ));
        }
    }
    out
}

pub fn format_not_found(identifier: &str, available: &[String]) -> String {
    let mut out = format!("Unknown gate or trigger: {identifier}\n");
    if !available.is_empty() {
        out.push_str("\nAvailable:\n");
        for name in available {
            out.push_str(&format!("  - {name}\n"));
        }
    }
    out
}

/// Every gate, trigger, and parameter.
pub fn gate_help() -> String {
    let mut out = String::new();
    for gate in Gate::ALL {
        out.push_str(gate.name());
        out.push('\n');
        for spec in gate.triggers() {
            out.push_str(&format!("  {}: {}\n", spec.name, spec.description));
            for p in spec.params {
                out.push_str(&format!("    {}: {}\n", p.name, p.description));
            }
        }
    }
    out
}

/// A policy file enabling every trigger at GO, with example parameters.
pub fn policy_template() -> String {
    let mut out = String::from("# GATE:TRIGGER:ACTION[:PARAM=value ...]\n");
    for gate in Gate::ALL {
        out.push_str(&format!("\n# {}\n", gate.name()));
        for spec in gate.triggers() {
            out.push_str(&format!("{}:{}:GO", gate.name(), spec.name));
            if !spec.params.is_empty() {
                let params: Vec<String> = spec
                    .params
                    .iter()
                    .map(|p| format!("{}={}", p.name, p.example))
                    .collect();
                out.push(':');
                out.push_str(&params.join(" "));
            }
            out.push('\n');
        }
    }
    out
}
