//! Pure policy gate evaluation (no IO).
//!
//! Input: a validated policy bundle (or an ad hoc policy) and analysis reports loaded elsewhere.
//! Output: findings, per-rule errors, and a final verdict per image.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod bundle;
pub mod diff;
pub mod dockerfile;
pub mod error;
pub mod gates;
pub mod mapping;
pub mod model;
pub mod policy;
pub mod whitelist;

mod engine;
mod fingerprint;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use aggregate::{aggregate, batch_worst, strip_final};
pub use bundle::{parse_bundle_json, validate_bundle};
pub use diff::diff;
pub use engine::{GateOutput, evaluate, evaluate_image};
pub use error::{BundleError, BundleProblem, ResolveError};
pub use fingerprint::policy_digest;
pub use gates::{Gate, GateRegistry, TriggerSpec};
pub use mapping::{ImageTag, resolve};
pub use model::GateContext;
pub use policy::{PolicySource, ResolvedPolicy};
pub use whitelist::apply as apply_whitelist;
