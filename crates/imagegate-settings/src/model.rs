use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `imagegate.toml` schema v1.
///
/// Every key is optional; missing keys take the defaults documented on
/// [`crate::EffectiveSettings`]. Relative paths resolve against `data_dir`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ImagegateConfigV1 {
    /// Optional schema string for tooling (`imagegate.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Directory of per-image analysis records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_store: Option<String>,

    /// Directory holding the cached policy bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_dir: Option<String>,

    /// Gate policy text file used when no bundle or per-image policy applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_policy: Option<String>,

    /// Built-in policy used when the global policy file does not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_preset: Option<String>,

    /// Base URL of the bundle service; the bundle id is appended as a path segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_bundle_id: Option<String>,

    /// Per-attempt timeout for bundle sync, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_conn_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_max_retries: Option<u32>,

    /// Environment variable holding the bearer token for bundle sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token_env: Option<String>,

    /// Width of the evaluation worker pool. `0` or unset means available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_json: Option<bool>,
}
