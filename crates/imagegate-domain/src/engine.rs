use crate::aggregate::aggregate;
use crate::gates::{GateRegistry, Params, TriggerError};
use crate::model::GateContext;
use crate::policy::ResolvedPolicy;
use crate::whitelist;
use imagegate_types::{EvaluationResult, Finding, GateRule, RuleError};

/// Raw gate output for one image: findings in rule order plus the rules that could not run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GateOutput {
    pub findings: Vec<Finding>,
    pub rule_errors: Vec<RuleError>,
}

/// Run every rule in policy order. A bad rule is recorded and skipped; it never aborts the rest.
pub fn evaluate(ctx: &GateContext<'_>, rules: &[GateRule]) -> GateOutput {
    let registry = GateRegistry::builtin();
    let mut out = GateOutput::default();

    for rule in rules {
        let rule_error = |message: String| RuleError {
            gate: rule.gate.clone(),
            trigger: rule.trigger.clone(),
            message,
        };

        let Some((_, spec)) = registry.lookup(&rule.gate, &rule.trigger) else {
            let message = if registry.has_gate(&rule.gate) {
                format!("unknown trigger '{}' for gate {}", rule.trigger, rule.gate)
            } else {
                format!("unknown gate '{}'", rule.gate)
            };
            out.rule_errors.push(rule_error(message));
            continue;
        };

        let unknown: Vec<&str> = rule
            .params
            .keys()
            .filter(|name| spec.param(name).is_none())
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            out.rule_errors.push(rule_error(format!(
                "unknown parameter(s) {}",
                unknown.join(", ")
            )));
            continue;
        }

        if spec.needs_base && ctx.base.is_none() {
            out.rule_errors
                .push(rule_error(TriggerError::MissingBase.to_string()));
            continue;
        }

        match (spec.eval)(ctx, &Params::new(&rule.params)) {
            Ok(raw) => out.findings.extend(raw.into_iter().map(|r| Finding {
                gate: rule.gate.clone(),
                trigger: rule.trigger.clone(),
                id: r.id,
                action: rule.action,
                message: r.message,
                whitelisted: false,
            })),
            Err(err) => out.rule_errors.push(rule_error(err.to_string())),
        }
    }

    out
}

/// Gate evaluation, whitelisting and aggregation for one image.
///
/// `evaluated_at` is left unset; the caller stamps it.
pub fn evaluate_image(
    ctx: &GateContext<'_>,
    policy: &ResolvedPolicy,
    show_whitelisted: bool,
) -> EvaluationResult {
    let GateOutput {
        findings,
        rule_errors,
    } = evaluate(ctx, &policy.rules);

    let marked = whitelist::mark(findings, &policy.whitelist);
    let whitelisted_count = marked.iter().filter(|f| f.whitelisted).count() as u32;
    let visible = whitelist::apply(marked, &[], show_whitelisted);

    let mut result = aggregate(
        &ctx.report.image_id,
        &policy.policy_id,
        &policy.whitelist_ids,
        visible,
    );
    result.rule_errors = rule_errors;
    result.whitelisted_count = whitelisted_count;
    result.policy_digest = policy.digest();
    result
}
