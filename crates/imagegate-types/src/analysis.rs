//! The analyzer output contract.
//!
//! An `AnalysisReport` is produced once per analysis run by an external analyzer and is never
//! mutated afterwards; re-analysis replaces the record wholesale.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    None,
    Base,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::None => "none",
            UserType::Base => "base",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageMeta {
    pub version: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileMeta {
    /// Octal permission string as reported by the analyzer (e.g. `"4755"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    /// Content-derived identifier (hex digest, optionally `sha256:`-prefixed).
    pub image_id: String,

    /// Ancestor image ids, root/base first. May include the image itself as the last entry.
    #[serde(default)]
    pub family_tree: Vec<String>,

    #[serde(default)]
    pub current_tags: Vec<String>,
    #[serde(default)]
    pub all_tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_contents: Option<String>,

    #[serde(default)]
    pub packages: BTreeMap<String, PackageMeta>,
    #[serde(default)]
    pub files: BTreeMap<String, FileMeta>,
    #[serde(default)]
    pub suid_files: BTreeMap<String, FileMeta>,

    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub user_type: UserType,

    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub analyzed_at: OffsetDateTime,
}

impl AnalysisReport {
    /// First 12 hex characters of the image id, without any digest prefix.
    pub fn short_id(&self) -> &str {
        short_id(&self.image_id)
    }

    /// The declared base image: `family_tree[0]`, or the image itself for a root image.
    pub fn base_id(&self) -> &str {
        self.family_tree
            .first()
            .map(String::as_str)
            .unwrap_or(&self.image_id)
    }
}

pub fn short_id(image_id: &str) -> &str {
    let bare = image_id.strip_prefix("sha256:").unwrap_or(image_id);
    let end = bare
        .char_indices()
        .nth(12)
        .map(|(idx, _)| idx)
        .unwrap_or(bare.len());
    &bare[..end]
}
