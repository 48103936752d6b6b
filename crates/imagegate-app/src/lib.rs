//! Use case orchestration for imagegate.
//!
//! This crate coordinates the domain, store, and render layers: it resolves which policy applies
//! to each image, runs batch evaluation on a worker pool, and builds reports. The CLI crate depends
//! on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod audit;
mod bundle;
mod context;
mod explain;
mod gate;
mod policy;
mod render;

pub use audit::{audit_row, run_audit};
pub use bundle::{
    BundleSelection, SyncOutcome, SyncRequest, SyncTarget, load_bundle, show_bundle, sync_bundle,
};
pub use context::{GateOptions, RunContext};
pub use explain::{
    ExplainOutput, format_explanation, format_not_found, gate_help, policy_template, run_explain,
};
pub use gate::{
    EXIT_ERROR, ExitCodeScheme, FailureStage, GateRun, ImageFailure, ImageOutcome,
    build_gate_report, exit_code, run_gate, select_images,
};
pub use policy::{
    LocalPolicies, list_image_policy, load_policy_file, load_whitelist_file, remove_image_policy,
    resolve_policy, update_image_policy,
};
pub use render::{renderable_audit, renderable_bundle, renderable_gate_run};
