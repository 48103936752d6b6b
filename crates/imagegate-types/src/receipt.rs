use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::bundle::Action;

/// Stable schema identifiers for emitted reports.
pub const SCHEMA_GATE_REPORT_V1: &str = "imagegate.gate_report.v1";
pub const SCHEMA_AUDIT_REPORT_V1: &str = "imagegate.audit_report.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub gate: String,
    pub trigger: String,

    /// The offending entity (package name, file path, port, ...). Findings without an id can
    /// only be whitelisted by a `*` item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub action: Action,
    pub message: String,

    #[serde(default)]
    pub whitelisted: bool,
}

/// A rule that could not be evaluated. The rule is skipped; the rest of the policy still runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleError {
    pub gate: String,
    pub trigger: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationResult {
    pub image_id: String,
    pub policy_id: String,
    #[serde(default)]
    pub whitelist_ids: Vec<String>,

    /// Policy-rule order, terminated by the `FINAL` sentinel.
    pub findings: Vec<Finding>,
    pub final_action: Action,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_errors: Vec<RuleError>,

    /// Number of findings suppressed by a whitelist (whether shown or dropped).
    #[serde(default)]
    pub whitelisted_count: u32,

    /// SHA-256 over the resolved policy and whitelist items; used for cache reuse.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub policy_digest: String,

    #[schemars(with = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "time::serde::rfc3339::option")]
    pub evaluated_at: Option<OffsetDateTime>,

    /// `analyzed_at` of the image report the result was computed from.
    #[schemars(with = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "time::serde::rfc3339::option")]
    pub analyzed_at: Option<OffsetDateTime>,

    /// `analyzed_at` of the base report, when base-dependent rules ran against one.
    #[schemars(with = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(with = "time::serde::rfc3339::option")]
    pub base_analyzed_at: Option<OffsetDateTime>,
}

/// Package/file deltas of an image relative to its base.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageDiff {
    pub image_id: String,
    pub base_id: String,
    pub added_packages: Vec<String>,
    pub removed_packages: Vec<String>,
    pub changed_packages: Vec<String>,
    pub added_files: Vec<String>,
    pub removed_files: Vec<String>,
    pub added_suid_files: Vec<String>,
    pub removed_suid_files: Vec<String>,
}

impl ImageDiff {
    pub fn is_empty(&self) -> bool {
        self.added_packages.is_empty()
            && self.removed_packages.is_empty()
            && self.changed_packages.is_empty()
            && self.added_files.is_empty()
            && self.removed_files.is_empty()
            && self.added_suid_files.is_empty()
            && self.removed_suid_files.is_empty()
    }
}

/// Coarse error classes surfaced to users and scripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Config,
    Data,
    Network,
    Auth,
}

/// An image that could not be evaluated. Distinct from a STOP verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageError {
    pub image: String,
    pub stage: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BundleRef {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchVerdict {
    /// Worst final action over all evaluated images; absent when nothing was evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_action: Option<Action>,
    pub evaluated: u32,
    pub failed: u32,
    pub exit_code: i32,
}

/// Gate run report (`imagegate.gate_report.v1`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GateReport {
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleRef>,
    pub verdict: BatchVerdict,
    pub results: Vec<EvaluationResult>,
    #[serde(default)]
    pub errors: Vec<ImageError>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditCounts {
    pub packages: u32,
    pub files: u32,
    pub suid_files: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditRow {
    pub image_id: String,
    pub short_id: String,
    pub user_type: String,
    pub current_tags: Vec<String>,
    pub all_tags: Vec<String>,
    pub analyzed: bool,
    /// `GO`/`WARN`/`STOP` from the cached evaluation, or `UNKNOWN`.
    pub gate_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<AuditCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    /// Counts of added packages, files, and suid files relative to the base image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_diff: Option<AuditCounts>,
}

/// Audit report (`imagegate.audit_report.v1`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditReport {
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub rows: Vec<AuditRow>,
}
