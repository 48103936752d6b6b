use crate::fingerprint::policy_digest;
use crate::gates::GateRegistry;
use imagegate_types::ids::ADHOC_POLICY_ID;
use imagegate_types::{GateRule, WhitelistItem};

/// Where a resolved policy came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicySource {
    /// Matched bundle mapping (index into `PolicyBundle::mappings`) and the tag that matched it.
    /// `tag` is `None` when the default mapping was used as a fallback.
    Mapping { index: usize, tag: Option<String> },
    /// An explicit policy file given for this run.
    Override,
    /// A policy stored for this image.
    Image,
    /// The configured global policy file.
    Global,
    /// The built-in default policy.
    BuiltIn,
}

impl PolicySource {
    pub fn label(&self) -> &'static str {
        match self {
            PolicySource::Mapping { tag: Some(_), .. } => "bundle mapping",
            PolicySource::Mapping { tag: None, .. } => "bundle default mapping",
            PolicySource::Override => "policy override",
            PolicySource::Image => "image policy",
            PolicySource::Global => "global policy",
            PolicySource::BuiltIn => "built-in policy",
        }
    }
}

/// The policy and whitelist items that apply to one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub policy_id: String,
    pub rules: Vec<GateRule>,
    pub whitelist_ids: Vec<String>,
    /// Items of every whitelist in `whitelist_ids`, in order, plus any appended extras.
    pub whitelist: Vec<WhitelistItem>,
    pub source: PolicySource,
}

impl ResolvedPolicy {
    /// An ad hoc policy used verbatim: no whitelists apply.
    pub fn adhoc(rules: Vec<GateRule>) -> Self {
        Self::standalone(ADHOC_POLICY_ID, rules, PolicySource::Override)
    }

    pub fn standalone(policy_id: &str, rules: Vec<GateRule>, source: PolicySource) -> Self {
        Self {
            policy_id: policy_id.to_string(),
            rules,
            whitelist_ids: Vec::new(),
            whitelist: Vec::new(),
            source,
        }
    }

    /// Append whitelist items under an extra id (e.g. a global whitelist file).
    pub fn with_extra_whitelist(mut self, id: &str, items: Vec<WhitelistItem>) -> Self {
        if !self.whitelist_ids.iter().any(|w| w == id) {
            self.whitelist_ids.push(id.to_string());
        }
        self.whitelist.extend(items);
        self
    }

    pub fn digest(&self) -> String {
        policy_digest(&self.policy_id, &self.rules, &self.whitelist)
    }

    /// Whether any rule compares the image against its base.
    pub fn needs_base(&self) -> bool {
        let registry = GateRegistry::builtin();
        self.rules.iter().any(|rule| {
            registry
                .lookup(&rule.gate, &rule.trigger)
                .is_some_and(|(_, spec)| spec.needs_base)
        })
    }
}
