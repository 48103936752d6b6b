//! Storage adapters: analysis reports, per-image policies, the evaluation cache, and the policy
//! bundle cache with its remote sync.
//!
//! This crate does filesystem and network IO. It never evaluates policy; that stays in
//! `imagegate-domain`.

#![forbid(unsafe_code)]

mod auth;
mod bundle;
mod cache;
mod error;
mod layout;
mod policies;
mod reports;
mod sync;

pub use auth::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use bundle::{BundleOrigin, BundleStore, write_bundle};
pub use cache::{CacheKey, EvalCache};
pub use error::StoreError;
pub use layout::{ANALYSIS_REPORT_FILE, EVAL_CACHE_FILE, IMAGE_POLICY_FILE, write_atomic};
pub use policies::ImagePolicyStore;
pub use reports::{AnalysisReportReader, FsReportReader, ImageEntry};
pub use sync::{BackoffPolicy, BundleSync, HttpBundleSync, RetryPolicy, SyncError, fetch_with_retry};
