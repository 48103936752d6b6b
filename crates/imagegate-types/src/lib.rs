//! Stable DTOs and IDs used across the imagegate workspace.
//!
//! This crate is intentionally boring:
//! - the analyzer output contract (`AnalysisReport`)
//! - policy bundle documents and their validated form
//! - findings, evaluation results, and emitted report envelopes
//! - stable gate/trigger names and the gate explain registry

#![forbid(unsafe_code)]

pub mod analysis;
pub mod bundle;
pub mod explain;
pub mod ids;
pub mod receipt;

pub use analysis::{AnalysisReport, FileMeta, PackageMeta, UserType, short_id};
pub use bundle::{
    Action, BundleDocument, GateRule, Mapping, PolicyBundle, RuleDocument, WhitelistItem,
};
pub use explain::{ExamplePair, Explanation, all_gate_names, lookup_explanation};
pub use receipt::{
    AuditCounts, AuditReport, AuditRow, BatchVerdict, BundleRef, ErrorKind, EvaluationResult,
    Finding, GateReport, ImageDiff, ImageError, RuleError, SCHEMA_AUDIT_REPORT_V1,
    SCHEMA_GATE_REPORT_V1, ToolMeta,
};
