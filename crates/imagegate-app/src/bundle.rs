//! `policybundle show|sync` and bundle selection for `gate`.

use anyhow::Context;
use camino::Utf8PathBuf;
use imagegate_domain::parse_bundle_json;
use imagegate_settings::EffectiveSettings;
use imagegate_store::{
    BundleOrigin, BundleStore, EnvTokenProvider, HttpBundleSync, RetryPolicy, fetch_with_retry,
    write_bundle,
};
use imagegate_types::{BundleDocument, PolicyBundle};
use time::OffsetDateTime;
use tracing::info;

/// Which bundle, if any, a gate run evaluates against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BundleSelection {
    /// Local policies only.
    #[default]
    None,
    /// The synced bundle; refreshed first when a remote is configured.
    Cached,
    File(Utf8PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncTarget {
    Cache,
    File(Utf8PathBuf),
    Stdout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncRequest {
    /// Bundle bytes to import instead of fetching from the remote.
    pub input: Option<Vec<u8>>,
    pub target: SyncTarget,
}

struct Remote {
    sync: HttpBundleSync,
    tokens: EnvTokenProvider,
    retry: RetryPolicy,
    bundle_id: String,
}

fn remote(settings: &EffectiveSettings) -> anyhow::Result<Option<Remote>> {
    let (Some(url), Some(bundle_id)) = (&settings.policy_url, &settings.policy_bundle_id) else {
        return Ok(None);
    };
    Ok(Some(Remote {
        sync: HttpBundleSync::new(url, settings.conn_timeout)?,
        tokens: EnvTokenProvider::new(&settings.auth_token_env),
        retry: RetryPolicy {
            max_attempts: settings.max_retries as usize,
            ..RetryPolicy::default()
        },
        bundle_id: bundle_id.clone(),
    }))
}

fn store(settings: &EffectiveSettings) -> BundleStore {
    BundleStore::new(settings.bundle_cache_path())
}

pub fn load_bundle(
    settings: &EffectiveSettings,
    selection: &BundleSelection,
    now: OffsetDateTime,
) -> anyhow::Result<Option<(PolicyBundle, BundleOrigin)>> {
    let store = store(settings);
    match selection {
        BundleSelection::None => Ok(None),
        BundleSelection::File(path) => {
            let bundle = store
                .load_file(path)
                .with_context(|| format!("load bundle file {path}"))?;
            Ok(Some((bundle, BundleOrigin::File(path.clone()))))
        }
        BundleSelection::Cached => {
            if let Some(r) = remote(settings)? {
                let loaded = store
                    .sync_or_cached(&r.sync, &r.tokens, &r.bundle_id, &r.retry, now)
                    .context("sync policy bundle")?;
                return Ok(Some(loaded));
            }
            let bundle = store
                .load_cached()
                .context("load cached policy bundle")?
                .with_context(|| {
                    format!(
                        "no policy bundle at {}; run `imagegate policybundle sync` or pass --bundlefile",
                        store.cache_path()
                    )
                })?;
            Ok(Some((bundle, BundleOrigin::Cache)))
        }
    }
}

/// The cached bundle, if one has been synced.
pub fn show_bundle(settings: &EffectiveSettings) -> anyhow::Result<Option<PolicyBundle>> {
    store(settings)
        .load_cached()
        .context("load cached policy bundle")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub bundle: PolicyBundle,
    /// Pretty JSON when the target is stdout.
    pub stdout: Option<String>,
}

/// Fetch (or import) a bundle, validate it, and write it to the target.
///
/// Nothing is written unless the bundle validates.
pub fn sync_bundle(
    settings: &EffectiveSettings,
    request: SyncRequest,
    now: OffsetDateTime,
) -> anyhow::Result<SyncOutcome> {
    let bytes = match request.input {
        Some(bytes) => bytes,
        None => {
            let r = remote(settings)?.context(
                "cannot sync: set policy_url and policy_bundle_id in the config, or pass --infile",
            )?;
            fetch_with_retry(&r.sync, &r.tokens, &r.bundle_id, &r.retry)
                .context("fetch policy bundle")?
        }
    };

    let outcome = match request.target {
        SyncTarget::Cache => {
            let bundle = store(settings).import(&bytes, now)?;
            SyncOutcome {
                bundle,
                stdout: None,
            }
        }
        SyncTarget::File(path) => {
            let bundle = stamped(&bytes, now)?;
            write_bundle(&path, &bundle).with_context(|| format!("write bundle to {path}"))?;
            SyncOutcome {
                bundle,
                stdout: None,
            }
        }
        SyncTarget::Stdout => {
            let bundle = stamped(&bytes, now)?;
            let mut text = serde_json::to_string_pretty(&BundleDocument::from(&bundle))
                .context("serialize bundle")?;
            text.push('\n');
            SyncOutcome {
                bundle,
                stdout: Some(text),
            }
        }
    };
    info!(
        bundle_id = %outcome.bundle.id,
        policies = outcome.bundle.policies.len(),
        mappings = outcome.bundle.mappings.len(),
        "policy bundle synced"
    );
    Ok(outcome)
}

fn stamped(bytes: &[u8], now: OffsetDateTime) -> anyhow::Result<PolicyBundle> {
    let mut bundle = parse_bundle_json(bytes)?;
    bundle.synced_at = Some(now);
    Ok(bundle)
}
