//! Bundle validation.
//!
//! A bundle is accepted whole or not at all: every problem is collected and reported together, and
//! no `PolicyBundle` is produced unless the list is empty.

use crate::error::{BundleError, BundleProblem};
use imagegate_types::{Action, BundleDocument, GateRule, PolicyBundle};
use std::collections::BTreeMap;

pub fn parse_bundle_json(bytes: &[u8]) -> Result<PolicyBundle, BundleError> {
    let doc: BundleDocument = serde_json::from_slice(bytes)?;
    validate_bundle(doc)
}

pub fn validate_bundle(doc: BundleDocument) -> Result<PolicyBundle, BundleError> {
    let mut problems = Vec::new();

    if doc.id.trim().is_empty() {
        problems.push(BundleProblem::EmptyField { field: "id" });
    }

    for (idx, mapping) in doc.mappings.iter().enumerate() {
        if !doc.policies.contains_key(&mapping.policy_id) {
            problems.push(BundleProblem::UnknownPolicy {
                mapping: idx,
                policy_id: mapping.policy_id.clone(),
            });
        }
        for whitelist_id in &mapping.whitelist_ids {
            if !doc.whitelists.contains_key(whitelist_id) {
                problems.push(BundleProblem::UnknownWhitelist {
                    mapping: idx,
                    whitelist_id: whitelist_id.clone(),
                });
            }
        }
    }

    let mut policies: BTreeMap<String, Vec<GateRule>> = BTreeMap::new();
    for (policy_id, rules) in &doc.policies {
        let mut typed = Vec::with_capacity(rules.len());
        for (idx, rule) in rules.iter().enumerate() {
            match Action::parse(&rule.action) {
                Some(action) => typed.push(GateRule {
                    gate: rule.gate.clone(),
                    trigger: rule.trigger.clone(),
                    action,
                    params: rule.params.clone(),
                }),
                None => problems.push(BundleProblem::InvalidAction {
                    policy_id: policy_id.clone(),
                    rule: idx,
                    action: rule.action.clone(),
                }),
            }
        }
        policies.insert(policy_id.clone(), typed);
    }

    if !problems.is_empty() {
        return Err(BundleError::Invalid(problems));
    }

    Ok(PolicyBundle {
        id: doc.id,
        name: doc.name,
        synced_at: doc.synced_at,
        policies,
        whitelists: doc.whitelists,
        mappings: doc.mappings,
    })
}
