use imagegate_types::{GateRule, WhitelistItem};
use sha2::{Digest, Sha256};

/// Stable SHA-256 over a resolved policy and its whitelist items.
///
/// Identity fields, one line each:
/// - `policy|<policy_id>`
/// - `rule|gate|trigger|action|k=v,k=v` in rule order (params in key order)
/// - `allow|gate|trigger|id` in whitelist order
pub fn policy_digest(policy_id: &str, rules: &[GateRule], whitelist: &[WhitelistItem]) -> String {
    let mut lines = vec![format!("policy|{policy_id}")];
    for rule in rules {
        let params = rule
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!(
            "rule|{}|{}|{}|{}",
            rule.gate, rule.trigger, rule.action, params
        ));
    }
    for item in whitelist {
        lines.push(format!("allow|{}|{}|{}", item.gate, item.trigger, item.id));
    }
    let canonical = lines.join("\n");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}
