//! Property-based tests for the domain crate.
//!
//! Invariants covered:
//! - aggregation is idempotent and equals the max over non-whitelisted actions
//! - whitelisting never changes a finding's action
//! - resolution is total whenever a default mapping exists
//! - diffing an image against itself is empty
//!
//! plus the end-to-end scenarios for a missing Dockerfile and tag-based policy selection.

use crate::aggregate::{aggregate, strip_final};
use crate::diff::diff;
use crate::engine::evaluate_image;
use crate::mapping::resolve;
use crate::model::GateContext;
use crate::policy::ResolvedPolicy;
use crate::test_support::{
    bundle_with_mappings, finding, mapping, report, rule, with_files, with_packages, with_suid,
};
use crate::whitelist;
use imagegate_types::{Action, Finding, WhitelistItem, ids};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Go), Just(Action::Warn), Just(Action::Stop)]
}

fn arb_gate_trigger() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop_oneof![
        Just((ids::GATE_DOCKERFILECHECK, ids::TRIGGER_NOFROM)),
        Just((ids::GATE_PKGBLACKLIST, ids::TRIGGER_PKGNAMEMATCH)),
        Just((ids::GATE_SUIDCHECK, ids::TRIGGER_SUIDFILE)),
        Just((ids::GATE_FILECHECK, ids::TRIGGER_FILENAMEMATCH)),
    ]
}

fn arb_id() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[a-z]{1,6}").expect("valid regex"))
}

fn arb_finding() -> impl Strategy<Value = Finding> {
    (arb_gate_trigger(), arb_id(), arb_action(), any::<bool>()).prop_map(
        |((gate, trigger), id, action, whitelisted)| {
            let mut f = finding(gate, trigger, id.as_deref(), action);
            f.whitelisted = whitelisted;
            f
        },
    )
}

fn arb_whitelist_item() -> impl Strategy<Value = WhitelistItem> {
    (
        arb_gate_trigger(),
        prop_oneof![
            Just("*".to_string()),
            prop::string::string_regex("[a-z]{1,6}").expect("valid regex")
        ],
    )
        .prop_map(|((gate, trigger), id)| WhitelistItem::new(gate, trigger, &id))
}

fn arb_pattern() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        prop::string::string_regex("[a-z]{1,5}").expect("valid regex"),
    ]
}

fn arb_tag() -> impl Strategy<Value = String> {
    (
        prop::option::of(prop_oneof![
            Just("quay.io"),
            Just("localhost:5000"),
            Just("registry.local")
        ]),
        prop::string::string_regex("[a-z]{1,5}(/[a-z]{1,5})?").expect("valid regex"),
        prop::option::of(prop::string::string_regex("[a-z0-9.]{1,5}").expect("valid regex")),
    )
        .prop_map(|(registry, repo, tag)| {
            let mut s = match registry {
                Some(r) => format!("{r}/{repo}"),
                None => repo,
            };
            if let Some(t) = tag {
                s.push(':');
                s.push_str(&t);
            }
            s
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn aggregation_is_idempotent(findings in prop::collection::vec(arb_finding(), 0..12)) {
        let once = aggregate("img", "p", &[], findings.clone());
        let twice = aggregate("img", "p", &[], once.findings.clone());
        prop_assert_eq!(once.final_action, twice.final_action);
        prop_assert_eq!(&once.findings, &twice.findings);

        let expected = findings
            .iter()
            .filter(|f| !f.whitelisted)
            .map(|f| f.action)
            .max()
            .unwrap_or(Action::Go);
        prop_assert_eq!(once.final_action, expected);
        prop_assert_eq!(strip_final(once.findings).len(), findings.len());
    }

    #[test]
    fn whitelisting_never_changes_actions(
        findings in prop::collection::vec(arb_finding(), 0..12),
        items in prop::collection::vec(arb_whitelist_item(), 0..6),
    ) {
        let shown = whitelist::apply(findings.clone(), &items, true);
        prop_assert_eq!(shown.len(), findings.len());
        for (before, after) in findings.iter().zip(&shown) {
            prop_assert_eq!(before.action, after.action);
            prop_assert_eq!(&before.id, &after.id);
            prop_assert!(after.whitelisted || !before.whitelisted);
        }

        let hidden = whitelist::apply(findings, &items, false);
        prop_assert!(hidden.iter().all(|f| !f.whitelisted));
    }

    #[test]
    fn resolution_is_total_with_default_mapping(
        patterns in prop::collection::vec((arb_pattern(), arb_pattern(), arb_pattern()), 0..5),
        tags in prop::collection::vec(arb_tag(), 0..4),
    ) {
        let mut mappings: Vec<_> = patterns
            .iter()
            .enumerate()
            .map(|(i, (reg, repo, tag))| mapping(reg, repo, tag, &format!("p{i}")))
            .collect();
        mappings.push(mapping("*", "*", "*", "default"));
        let bundle = bundle_with_mappings(mappings);

        let resolved = resolve(&bundle, &tags, None);
        prop_assert!(resolved.is_ok());
    }

    #[test]
    fn diff_against_self_is_empty(
        packages in prop::collection::btree_map("[a-z]{1,6}", "[0-9.]{1,5}", 0..8),
        files in prop::collection::vec("/[a-z]{1,6}", 0..8),
    ) {
        let pkgs: Vec<(&str, &str)> = packages.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let paths: Vec<&str> = files.iter().map(String::as_str).collect();
        let image = with_suid(with_files(with_packages(report("img"), &pkgs), &paths), &paths);
        prop_assert!(diff(&image, &image).is_empty());
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn missing_dockerfile_stops() {
    let bundle = bundle_with_mappings(vec![mapping("*", "*", "*", "P1")]);
    let image = report("img");
    let policy = resolve(&bundle, &[], None).expect("resolve");
    assert_eq!(policy.rules, vec![rule("DOCKERFILECHECK", "NOFROM", Action::Stop)]);

    let result = evaluate_image(&GateContext::new(&image), &policy, false);
    let visible: Vec<&Finding> = strip_final_refs(&result.findings);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].action, Action::Stop);
    assert_eq!(result.final_action, Action::Stop);
}

#[test]
fn wildcard_whitelist_hides_missing_dockerfile() {
    let image = report("img");
    let policy = ResolvedPolicy::standalone(
        "P1",
        vec![rule("DOCKERFILECHECK", "NOFROM", Action::Stop)],
        crate::policy::PolicySource::BuiltIn,
    )
    .with_extra_whitelist(
        "wl",
        vec![WhitelistItem::new("DOCKERFILECHECK", "NOFROM", "*")],
    );

    let result = evaluate_image(&GateContext::new(&image), &policy, false);
    assert!(strip_final_refs(&result.findings).is_empty());
    assert_eq!(result.final_action, Action::Go);
    assert_eq!(result.whitelisted_count, 1);

    let shown = evaluate_image(&GateContext::new(&image), &policy, true);
    let visible = strip_final_refs(&shown.findings);
    assert_eq!(visible.len(), 1);
    assert!(visible[0].whitelisted);
    assert_eq!(visible[0].action, Action::Stop);
    assert_eq!(shown.final_action, Action::Go);
}

#[test]
fn repository_mapping_selects_policy() {
    let bundle = bundle_with_mappings(vec![
        mapping("*", "myapp", "*", "strict"),
        mapping("*", "*", "*", "default"),
    ]);
    let strict = resolve(&bundle, &["myapp:latest".to_string()], None).expect("resolve");
    let default = resolve(&bundle, &["other:latest".to_string()], None).expect("resolve");
    assert_eq!(strict.policy_id, "strict");
    assert_eq!(default.policy_id, "default");
}

fn strip_final_refs(findings: &[Finding]) -> Vec<&Finding> {
    findings
        .iter()
        .filter(|f| !crate::aggregate::is_final(f))
        .collect()
}
