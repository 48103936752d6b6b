//! Conversions from report DTOs to the renderable model.

use imagegate_render::{
    RenderableAction, RenderableAuditRow, RenderableBundle, RenderableCounts, RenderableFailure,
    RenderableFinding, RenderableGateRun, RenderableImage, RenderableMapping,
};
use imagegate_settings::{render_policy_text, render_whitelist_text};
use imagegate_types::{
    Action, AuditCounts, AuditReport, EvaluationResult, GateReport, PolicyBundle, short_id,
};
use time::format_description::well_known::Rfc3339;

fn action(a: Action) -> RenderableAction {
    match a {
        Action::Go => RenderableAction::Go,
        Action::Warn => RenderableAction::Warn,
        Action::Stop => RenderableAction::Stop,
    }
}

fn image(result: &EvaluationResult) -> RenderableImage {
    RenderableImage {
        image_id: result.image_id.clone(),
        short_id: short_id(&result.image_id).to_string(),
        policy_id: result.policy_id.clone(),
        whitelist_ids: result.whitelist_ids.clone(),
        findings: result
            .findings
            .iter()
            .map(|f| RenderableFinding {
                gate: f.gate.clone(),
                trigger: f.trigger.clone(),
                trigger_id: f.id.clone(),
                message: f.message.clone(),
                action: action(f.action),
                whitelisted: f.whitelisted,
            })
            .collect(),
        final_action: action(result.final_action),
        rule_errors: result
            .rule_errors
            .iter()
            .map(|e| format!("{}:{}: {}", e.gate, e.trigger, e.message))
            .collect(),
    }
}

pub fn renderable_gate_run(report: &GateReport) -> RenderableGateRun {
    RenderableGateRun {
        bundle: report
            .bundle
            .as_ref()
            .map(|b| format!("{} ({})", b.name, b.id)),
        images: report.results.iter().map(image).collect(),
        failures: report
            .errors
            .iter()
            .map(|e| RenderableFailure {
                image: e.image.clone(),
                stage: e.stage.clone(),
                message: e.message.clone(),
            })
            .collect(),
        worst: report.verdict.worst_action.map(action),
    }
}

fn counts(c: &AuditCounts) -> RenderableCounts {
    RenderableCounts {
        packages: c.packages,
        files: c.files,
        suid_files: c.suid_files,
    }
}

pub fn renderable_audit(report: &AuditReport) -> Vec<RenderableAuditRow> {
    report
        .rows
        .iter()
        .map(|r| RenderableAuditRow {
            short_id: r.short_id.clone(),
            user_type: r.user_type.clone(),
            current_tags: r.current_tags.clone(),
            analyzed: r.analyzed,
            gate_status: r.gate_status.clone(),
            size_bytes: r.size_bytes,
            counts: r.counts.as_ref().map(counts),
            base_diff: r.base_diff.as_ref().map(counts),
        })
        .collect()
}

pub fn renderable_bundle(bundle: &PolicyBundle) -> RenderableBundle {
    let lines = |text: String| text.lines().map(str::to_string).collect::<Vec<_>>();
    RenderableBundle {
        id: bundle.id.clone(),
        name: bundle.name.clone(),
        synced_at: bundle.synced_at.and_then(|t| t.format(&Rfc3339).ok()),
        mappings: bundle
            .mappings
            .iter()
            .map(|m| RenderableMapping {
                name: m.name.clone(),
                registry: m.registry.clone(),
                repository: m.repository.clone(),
                tag: m.tag.clone(),
                policy_id: m.policy_id.clone(),
                whitelist_ids: m.whitelist_ids.clone(),
            })
            .collect(),
        policies: bundle
            .policies
            .iter()
            .map(|(id, rules)| (id.clone(), lines(render_policy_text(rules))))
            .collect(),
        whitelists: bundle
            .whitelists
            .iter()
            .map(|(id, items)| (id.clone(), lines(render_whitelist_text(items))))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagegate_render::{RenderOptions, render_bundle_text, render_gate_text};
    use imagegate_types::{
        BatchVerdict, Finding, GateRule, ImageError, ErrorKind, ToolMeta, WhitelistItem,
    };
    use std::collections::BTreeMap;
    use time::macros::datetime;

    #[test]
    fn gate_report_renders_results_and_failures() {
        let report = GateReport {
            schema: "imagegate.gate_report.v1".to_string(),
            tool: ToolMeta {
                name: "imagegate".to_string(),
                version: "0.0.0".to_string(),
            },
            started_at: datetime!(2024-01-01 0:00 UTC),
            finished_at: datetime!(2024-01-01 0:00 UTC),
            bundle: None,
            verdict: BatchVerdict {
                worst_action: Some(Action::Warn),
                evaluated: 1,
                failed: 1,
                exit_code: 3,
            },
            results: vec![EvaluationResult {
                image_id: "sha256:0123456789abcdef".to_string(),
                policy_id: "default".to_string(),
                whitelist_ids: Vec::new(),
                findings: vec![Finding {
                    gate: "FINAL".to_string(),
                    trigger: "FINAL".to_string(),
                    id: None,
                    action: Action::Warn,
                    message: "final action: WARN".to_string(),
                    whitelisted: false,
                }],
                final_action: Action::Warn,
                rule_errors: Vec::new(),
                whitelisted_count: 0,
                policy_digest: String::new(),
                evaluated_at: None,
                analyzed_at: None,
                base_analyzed_at: None,
            }],
            errors: vec![ImageError {
                image: "missing".to_string(),
                stage: "load_report".to_string(),
                kind: ErrorKind::Data,
                message: "analysis report for image missing not found".to_string(),
            }],
        };

        let run = renderable_gate_run(&report);
        assert_eq!(run.images[0].short_id, "0123456789ab");
        let text = render_gate_text(&run, RenderOptions::default());
        assert!(text.contains("Image Id: sha256:0123456789abcdef"));
        assert!(text.contains("missing  load_report"));
        assert!(text.ends_with("Worst action: WARN\n"));
    }

    #[test]
    fn bundle_rules_render_as_policy_text() {
        let bundle = PolicyBundle {
            id: "b".to_string(),
            name: "site".to_string(),
            synced_at: Some(datetime!(2024-06-01 8:30 UTC)),
            policies: BTreeMap::from([(
                "p".to_string(),
                vec![GateRule::new("DOCKERFILECHECK", "NOFROM", Action::Stop)],
            )]),
            whitelists: BTreeMap::from([(
                "w".to_string(),
                vec![WhitelistItem::new("DOCKERFILECHECK", "NOFROM", "*")],
            )]),
            mappings: Vec::new(),
        };
        let r = renderable_bundle(&bundle);
        assert_eq!(r.synced_at.as_deref(), Some("2024-06-01T08:30:00Z"));
        assert_eq!(r.policies[0].1, vec!["DOCKERFILECHECK:NOFROM:STOP".to_string()]);
        assert_eq!(r.whitelists[0].1, vec!["DOCKERFILECHECK:NOFROM:*".to_string()]);
        assert!(render_bundle_text(&r, true).contains("Whitelist w:\n  DOCKERFILECHECK:NOFROM:*\n"));
    }
}
