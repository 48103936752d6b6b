use imagegate_types::ids::FINAL;
use imagegate_types::{Action, EvaluationResult, Finding};

pub fn is_final(f: &Finding) -> bool {
    f.gate == FINAL && f.trigger == FINAL
}

/// Remove `FINAL` sentinels so a previous result's findings can be aggregated again.
pub fn strip_final(findings: Vec<Finding>) -> Vec<Finding> {
    findings.into_iter().filter(|f| !is_final(f)).collect()
}

/// Reduce findings to one verdict and append the `FINAL` sentinel.
pub fn aggregate(
    image_id: &str,
    policy_id: &str,
    whitelist_ids: &[String],
    findings: Vec<Finding>,
) -> EvaluationResult {
    let mut findings = strip_final(findings);
    let final_action = findings
        .iter()
        .filter(|f| !f.whitelisted)
        .map(|f| f.action)
        .max()
        .unwrap_or(Action::Go);

    findings.push(Finding {
        gate: FINAL.to_string(),
        trigger: FINAL.to_string(),
        id: None,
        action: final_action,
        message: format!("final action: {final_action}"),
        whitelisted: false,
    });

    EvaluationResult {
        image_id: image_id.to_string(),
        policy_id: policy_id.to_string(),
        whitelist_ids: whitelist_ids.to_vec(),
        findings,
        final_action,
        rule_errors: Vec::new(),
        whitelisted_count: 0,
        policy_digest: String::new(),
        evaluated_at: None,
        analyzed_at: None,
        base_analyzed_at: None,
    }
}

/// Worst action over a batch; `None` when nothing was evaluated. Independent of completion order.
pub fn batch_worst<I>(actions: I) -> Option<Action>
where
    I: IntoIterator<Item = Action>,
{
    actions.into_iter().max()
}

/// Final action recorded by the `FINAL` sentinel, if the result carries one.
pub fn final_from_findings(findings: &[Finding]) -> Option<Action> {
    findings.iter().rev().find(|f| is_final(f)).map(|f| f.action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::finding;

    #[test]
    fn empty_is_go_with_sentinel() {
        let r = aggregate("img", "p", &[], Vec::new());
        assert_eq!(r.final_action, Action::Go);
        assert_eq!(r.findings.len(), 1);
        assert!(is_final(&r.findings[0]));
        assert_eq!(final_from_findings(&r.findings), Some(Action::Go));
    }

    #[test]
    fn whitelisted_findings_do_not_count() {
        let mut stop = finding("SUIDCHECK", "SUIDFILE", Some("/bin/su"), Action::Stop);
        stop.whitelisted = true;
        let warn = finding("IMAGECHECK", "SIZEMAX", None, Action::Warn);

        let r = aggregate("img", "p", &["w".to_string()], vec![stop, warn]);
        assert_eq!(r.final_action, Action::Warn);
        assert_eq!(r.whitelist_ids, vec!["w"]);
        assert_eq!(r.findings.len(), 3);
    }

    #[test]
    fn reaggregation_keeps_single_sentinel() {
        let once = aggregate(
            "img",
            "p",
            &[],
            vec![finding("PKGDIFF", "PKGADD", Some("jq"), Action::Warn)],
        );
        let twice = aggregate("img", "p", &[], once.findings.clone());
        assert_eq!(twice.final_action, once.final_action);
        assert_eq!(twice.findings, once.findings);
    }

    #[test]
    fn batch_worst_is_order_independent() {
        assert_eq!(batch_worst(Vec::new()), None);
        assert_eq!(
            batch_worst([Action::Warn, Action::Go, Action::Stop]),
            Some(Action::Stop)
        );
        assert_eq!(
            batch_worst([Action::Stop, Action::Warn, Action::Go]),
            Some(Action::Stop)
        );
    }
}
