//! Whitelist suppression.
//!
//! Whitelisting only flips `Finding::whitelisted` (and, when hidden, drops the finding). The
//! recorded action is never touched.

use imagegate_types::ids::WILDCARD;
use imagegate_types::{Finding, WhitelistItem};

pub fn matches(item: &WhitelistItem, finding: &Finding) -> bool {
    if item.gate != finding.gate || item.trigger != finding.trigger {
        return false;
    }
    item.id == WILDCARD || finding.id.as_deref() == Some(item.id.as_str())
}

/// Mark every finding matched by any item. Order and actions are preserved.
pub fn mark(findings: Vec<Finding>, items: &[WhitelistItem]) -> Vec<Finding> {
    findings
        .into_iter()
        .map(|mut f| {
            if !f.whitelisted && items.iter().any(|item| matches(item, &f)) {
                f.whitelisted = true;
            }
            f
        })
        .collect()
}

/// Mark, then drop whitelisted findings unless `show_whitelisted`.
pub fn apply(findings: Vec<Finding>, items: &[WhitelistItem], show_whitelisted: bool) -> Vec<Finding> {
    let mut marked = mark(findings, items);
    if !show_whitelisted {
        marked.retain(|f| !f.whitelisted);
    }
    marked
}
