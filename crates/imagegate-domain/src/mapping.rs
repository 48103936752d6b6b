//! Tag → policy resolution.
//!
//! Mappings are ordered-first-match, like firewall rules: bundle authors list specific mappings
//! before broad ones. Tags are tried in the image's declared order, not sorted.

use crate::error::ResolveError;
use crate::policy::{PolicySource, ResolvedPolicy};
use imagegate_types::ids::WILDCARD;
use imagegate_types::{GateRule, Mapping, PolicyBundle, WhitelistItem};

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_TAG: &str = "latest";

/// `registry/repository:tag` split into the three components mappings match on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageTag {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageTag {
    /// Parse an image reference. A missing tag means `latest`. The first path component is a
    /// registry when it contains `.` or `:` or is `localhost`; otherwise the registry is
    /// `docker.io`. Digest suffixes (`@sha256:...`) are ignored.
    pub fn parse(reference: &str) -> ImageTag {
        let reference = reference.trim();
        let name = reference.split('@').next().unwrap_or(reference);

        let last_slash = name.rfind('/');
        let (name, tag) = match name.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                (&name[..colon], &name[colon + 1..])
            }
            _ => (name, ""),
        };
        let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest)) if is_registry(first) => (first, rest),
            _ => (DEFAULT_REGISTRY, name),
        };

        ImageTag {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn matches(&self, mapping: &Mapping) -> bool {
        pattern_matches(&mapping.registry, &self.registry)
            && pattern_matches(&mapping.repository, &self.repository)
            && pattern_matches(&mapping.tag, &self.tag)
    }
}

impl std::fmt::Display for ImageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

fn is_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

/// Index of the first mapping matched by any tag, trying tags in order.
pub fn find_mapping<'a>(mappings: &[Mapping], tags: &'a [String]) -> Option<(usize, &'a str)> {
    for tag in tags {
        let parsed = ImageTag::parse(tag);
        if let Some(index) = mappings.iter().position(|m| parsed.matches(m)) {
            return Some((index, tag.as_str()));
        }
    }
    None
}

/// Select the policy and whitelists for an image.
///
/// An explicit override short-circuits mapping lookup and is used verbatim, with no whitelists.
pub fn resolve(
    bundle: &PolicyBundle,
    tags: &[String],
    policy_override: Option<Vec<GateRule>>,
) -> Result<ResolvedPolicy, ResolveError> {
    if let Some(rules) = policy_override {
        return Ok(ResolvedPolicy::adhoc(rules));
    }

    let (index, source) = match find_mapping(&bundle.mappings, tags) {
        Some((index, tag)) => (
            index,
            PolicySource::Mapping {
                index,
                tag: Some(tag.to_string()),
            },
        ),
        None => {
            let index = bundle
                .mappings
                .iter()
                .position(Mapping::is_default)
                .ok_or_else(|| ResolveError::UnmappedImage {
                    tags: tags.to_vec(),
                })?;
            (index, PolicySource::Mapping { index, tag: None })
        }
    };

    let mapping = &bundle.mappings[index];
    // A validated bundle guarantees both lookups succeed.
    let rules = bundle
        .policies
        .get(&mapping.policy_id)
        .cloned()
        .unwrap_or_default();
    let whitelist: Vec<WhitelistItem> = mapping
        .whitelist_ids
        .iter()
        .filter_map(|id| bundle.whitelists.get(id))
        .flatten()
        .cloned()
        .collect();

    Ok(ResolvedPolicy {
        policy_id: mapping.policy_id.clone(),
        rules,
        whitelist_ids: mapping.whitelist_ids.clone(),
        whitelist,
        source,
    })
}
