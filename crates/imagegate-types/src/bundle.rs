//! Policy bundle documents.
//!
//! Two shapes exist on purpose:
//! - `BundleDocument` is the permissive wire form (actions are raw strings) that every source is
//!   parsed into first;
//! - `PolicyBundle` is the validated form the engine evaluates against. Only the domain crate's
//!   validator constructs it from a document.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

use crate::ids::WILDCARD;

/// Severity verdict of a fired trigger. Totally ordered: `GO < WARN < STOP`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Go,
    Warn,
    Stop,
}

impl Action {
    /// Parse an action token. Tokens are case-sensitive: `GO`, `WARN`, `STOP`.
    pub fn parse(token: &str) -> Option<Action> {
        match token {
            "GO" => Some(Action::Go),
            "WARN" => Some(Action::Warn),
            "STOP" => Some(Action::Stop),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Go => "GO",
            Action::Warn => "WARN",
            Action::Stop => "STOP",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GateRule {
    pub gate: String,
    pub trigger: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl GateRule {
    pub fn new(gate: &str, trigger: &str, action: Action) -> Self {
        Self {
            gate: gate.to_string(),
            trigger: trigger.to_string(),
            action,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WhitelistItem {
    pub gate: String,
    pub trigger: String,
    /// Exact finding id, or `*` to match every finding of the trigger.
    #[serde(rename = "idPattern", alias = "id")]
    pub id: String,
}

impl WhitelistItem {
    pub fn new(gate: &str, trigger: &str, id: &str) -> Self {
        Self {
            gate: gate.to_string(),
            trigger: trigger.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Mapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "registryPattern", alias = "registry")]
    pub registry: String,
    #[serde(rename = "repoPattern", alias = "repository")]
    pub repository: String,
    #[serde(rename = "tagPattern", alias = "tag")]
    pub tag: String,
    #[serde(rename = "policyId", alias = "policy_id")]
    pub policy_id: String,
    #[serde(default, rename = "whitelistIds", alias = "whitelist_ids")]
    pub whitelist_ids: Vec<String>,
}

impl Mapping {
    /// The default mapping matches every registry, repository, and tag.
    pub fn is_default(&self) -> bool {
        self.registry == WILDCARD && self.repository == WILDCARD && self.tag == WILDCARD
    }
}

/// A gate rule as written on the wire, before its action token is validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleDocument {
    pub gate: String,
    pub trigger: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// Policy bundle file format (`bundle.json`).
///
/// Mapping and whitelist keys are written in their published camelCase form
/// (`registryPattern`, `policyId`, `idPattern`, ...); the snake_case spellings are accepted on
/// input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BundleDocument {
    pub id: String,
    pub name: String,
    #[schemars(with = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "time::serde::rfc3339::option", alias = "syncedAt")]
    pub synced_at: Option<OffsetDateTime>,
    pub policies: BTreeMap<String, Vec<RuleDocument>>,
    #[serde(default)]
    pub whitelists: BTreeMap<String, Vec<WhitelistItem>>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

/// A validated bundle: every mapping points at known policies and whitelists, and every rule
/// carries a recognized action. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyBundle {
    pub id: String,
    pub name: String,
    #[schemars(with = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "time::serde::rfc3339::option", alias = "syncedAt")]
    pub synced_at: Option<OffsetDateTime>,
    pub policies: BTreeMap<String, Vec<GateRule>>,
    #[serde(default)]
    pub whitelists: BTreeMap<String, Vec<WhitelistItem>>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

impl PolicyBundle {
    /// The designated default mapping: the first `*/*/*` entry, if any.
    pub fn default_mapping(&self) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.is_default())
    }
}

impl From<&PolicyBundle> for BundleDocument {
    fn from(bundle: &PolicyBundle) -> Self {
        BundleDocument {
            id: bundle.id.clone(),
            name: bundle.name.clone(),
            synced_at: bundle.synced_at,
            policies: bundle
                .policies
                .iter()
                .map(|(id, rules)| {
                    let rules = rules
                        .iter()
                        .map(|r| RuleDocument {
                            gate: r.gate.clone(),
                            trigger: r.trigger.clone(),
                            action: r.action.as_str().to_string(),
                            params: r.params.clone(),
                        })
                        .collect();
                    (id.clone(), rules)
                })
                .collect(),
            whitelists: bundle.whitelists.clone(),
            mappings: bundle.mappings.clone(),
        }
    }
}
