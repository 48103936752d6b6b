//! Which policy applies to an image, and per-image policy management.

use anyhow::Context;
use camino::Utf8Path;
use imagegate_domain::{PolicySource, ResolvedPolicy, resolve};
use imagegate_settings::{EffectiveSettings, parse_policy_text, parse_whitelist_text, preset};
use imagegate_store::{ImagePolicyStore, StoreError};
use imagegate_types::ids::{GLOBAL_POLICY_ID, GLOBAL_WHITELIST_ID, IMAGE_POLICY_ID};
use imagegate_types::{AnalysisReport, GateRule, PolicyBundle, WhitelistItem};
use tracing::debug;

use crate::context::GateOptions;

/// Policies consulted when no bundle is in use, in order: per-image, global file, preset.
#[derive(Clone, Debug)]
pub struct LocalPolicies {
    pub image_policies: Option<ImagePolicyStore>,
    pub global: Option<Vec<GateRule>>,
    pub preset_name: String,
    pub preset: Vec<GateRule>,
}

impl LocalPolicies {
    /// Only a built-in preset; no per-image store and no global file.
    pub fn preset(name: &str) -> anyhow::Result<Self> {
        let rules = preset(name).with_context(|| format!("unknown policy preset: {name}"))?;
        Ok(Self {
            image_policies: None,
            global: None,
            preset_name: name.to_string(),
            preset: rules,
        })
    }

    pub fn from_settings(settings: &EffectiveSettings) -> anyhow::Result<Self> {
        let mut local = Self::preset(&settings.policy_preset)?;
        local.image_policies = Some(ImagePolicyStore::new(&settings.image_data_store));
        if settings.global_policy.is_file() {
            local.global = Some(load_policy_file(&settings.global_policy)?);
        }
        Ok(local)
    }
}

/// Select the policy for one image.
///
/// With a bundle, mapping resolution decides (an explicit override short-circuits it). Without
/// one: override, then the image's stored policy, then the global file, then the preset. A global
/// whitelist, when given, is appended in every case.
pub fn resolve_policy(
    bundle: Option<&PolicyBundle>,
    local: &LocalPolicies,
    options: &GateOptions,
    report: &AnalysisReport,
) -> anyhow::Result<ResolvedPolicy> {
    let tags = if options.use_tags.is_empty() {
        &report.current_tags
    } else {
        &options.use_tags
    };

    let policy = match bundle {
        Some(bundle) => resolve(bundle, tags, options.policy_override.clone())?,
        None => resolve_local(local, options, &report.image_id)?,
    };
    debug!(
        policy = %policy.policy_id,
        source = policy.source.label(),
        rules = policy.rules.len(),
        "resolved policy"
    );

    Ok(match &options.global_whitelist {
        Some(items) => policy.with_extra_whitelist(GLOBAL_WHITELIST_ID, items.clone()),
        None => policy,
    })
}

fn resolve_local(
    local: &LocalPolicies,
    options: &GateOptions,
    image_id: &str,
) -> Result<ResolvedPolicy, StoreError> {
    if let Some(rules) = &options.policy_override {
        return Ok(ResolvedPolicy::adhoc(rules.clone()));
    }
    if let Some(store) = &local.image_policies
        && let Some(rules) = store.load(image_id)?
    {
        return Ok(ResolvedPolicy::standalone(
            IMAGE_POLICY_ID,
            rules,
            PolicySource::Image,
        ));
    }
    if let Some(rules) = &local.global {
        return Ok(ResolvedPolicy::standalone(
            GLOBAL_POLICY_ID,
            rules.clone(),
            PolicySource::Global,
        ));
    }
    Ok(ResolvedPolicy::standalone(
        &local.preset_name,
        local.preset.clone(),
        PolicySource::BuiltIn,
    ))
}

pub fn load_policy_file(path: &Utf8Path) -> anyhow::Result<Vec<GateRule>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read policy file {path}"))?;
    parse_policy_text(&text).with_context(|| format!("parse policy file {path}"))
}

pub fn load_whitelist_file(path: &Utf8Path) -> anyhow::Result<Vec<WhitelistItem>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read whitelist file {path}"))?;
    parse_whitelist_text(&text).with_context(|| format!("parse whitelist file {path}"))
}

pub fn list_image_policy(
    store: &ImagePolicyStore,
    image_id: &str,
) -> anyhow::Result<Option<Vec<GateRule>>> {
    Ok(store.load(image_id)?)
}

/// Validate a policy file and store it for the image. Nothing is stored if the file is invalid.
pub fn update_image_policy(
    store: &ImagePolicyStore,
    image_id: &str,
    path: &Utf8Path,
) -> anyhow::Result<Vec<GateRule>> {
    let rules = load_policy_file(path)?;
    store
        .save(image_id, &rules)
        .with_context(|| format!("store policy for image {image_id}"))?;
    Ok(rules)
}

pub fn remove_image_policy(store: &ImagePolicyStore, image_id: &str) -> anyhow::Result<bool> {
    Ok(store.remove(image_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagegate_types::{Action, Mapping, UserType};
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn report(tags: &[&str]) -> AnalysisReport {
        AnalysisReport {
            image_id: "img1".to_string(),
            family_tree: Vec::new(),
            current_tags: tags.iter().map(|t| t.to_string()).collect(),
            all_tags: Vec::new(),
            dockerfile_contents: None,
            packages: BTreeMap::new(),
            files: BTreeMap::new(),
            suid_files: BTreeMap::new(),
            size_bytes: 0,
            user_type: UserType::None,
            analyzed_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn warn_rule() -> GateRule {
        GateRule::new("IMAGECHECK", "SIZEMAX", Action::Warn).with_param("MAXBYTES", "1")
    }

    #[test]
    fn local_chain_prefers_override_then_image_then_global_then_preset() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(tmp.path()).expect("utf8");
        let store = ImagePolicyStore::new(root);
        let mut local = LocalPolicies::preset("default").expect("preset");
        local.image_policies = Some(store.clone());

        let opts = GateOptions::default();
        let p = resolve_policy(None, &local, &opts, &report(&[])).expect("resolve");
        assert_eq!(p.source, PolicySource::BuiltIn);
        assert_eq!(p.policy_id, "default");

        local.global = Some(vec![warn_rule()]);
        let p = resolve_policy(None, &local, &opts, &report(&[])).expect("resolve");
        assert_eq!(p.source, PolicySource::Global);

        store.save("img1", &[warn_rule()]).expect("save");
        let p = resolve_policy(None, &local, &opts, &report(&[])).expect("resolve");
        assert_eq!(p.source, PolicySource::Image);
        assert_eq!(p.policy_id, IMAGE_POLICY_ID);

        let opts = GateOptions {
            policy_override: Some(Vec::new()),
            ..GateOptions::default()
        };
        let p = resolve_policy(None, &local, &opts, &report(&[])).expect("resolve");
        assert_eq!(p.source, PolicySource::Override);
        assert!(p.rules.is_empty());
    }

    #[test]
    fn use_tags_replace_report_tags_for_bundle_mapping() {
        let bundle = PolicyBundle {
            id: "b".to_string(),
            name: "b".to_string(),
            synced_at: None,
            policies: BTreeMap::from([("p".to_string(), vec![warn_rule()])]),
            whitelists: BTreeMap::new(),
            mappings: vec![Mapping {
                name: None,
                registry: "*".to_string(),
                repository: "myapp".to_string(),
                tag: "*".to_string(),
                policy_id: "p".to_string(),
                whitelist_ids: Vec::new(),
            }],
        };
        let local = LocalPolicies::preset("none").expect("preset");

        let err = resolve_policy(Some(&bundle), &local, &GateOptions::default(), &report(&["other:1"]))
            .unwrap_err();
        assert!(err.to_string().contains("other:1"));

        let opts = GateOptions {
            use_tags: vec!["myapp:2.0".to_string()],
            ..GateOptions::default()
        };
        let p = resolve_policy(Some(&bundle), &local, &opts, &report(&["other:1"])).expect("resolve");
        assert_eq!(p.policy_id, "p");
    }

    #[test]
    fn global_whitelist_is_appended() {
        let local = LocalPolicies::preset("default").expect("preset");
        let opts = GateOptions {
            global_whitelist: Some(vec![WhitelistItem::new("DOCKERFILECHECK", "NOFROM", "*")]),
            ..GateOptions::default()
        };
        let p = resolve_policy(None, &local, &opts, &report(&[])).expect("resolve");
        assert_eq!(p.whitelist_ids, vec![GLOBAL_WHITELIST_ID.to_string()]);
        assert_eq!(p.whitelist.len(), 1);
    }

    #[test]
    fn invalid_policy_file_is_not_stored() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(tmp.path()).expect("utf8");
        let store = ImagePolicyStore::new(root.join("data"));
        let file = root.join("bad.policy");
        std::fs::write(&file, "DOCKERFILECHECK:NOFROM:HALT\n").expect("write");

        let err = update_image_policy(&store, "img1", &file).unwrap_err();
        assert!(format!("{err:#}").contains("HALT"));
        assert_eq!(list_image_policy(&store, "img1").expect("list"), None);

        std::fs::write(&file, "# ok\nDOCKERFILECHECK:NOFROM:STOP\n").expect("write");
        update_image_policy(&store, "img1", &file).expect("update");
        assert_eq!(
            list_image_policy(&store, "img1").expect("list").map(|r| r.len()),
            Some(1)
        );
        assert!(remove_image_policy(&store, "img1").expect("remove"));
    }
}
