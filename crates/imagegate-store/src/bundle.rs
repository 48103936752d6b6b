use crate::auth::TokenProvider;
use crate::error::StoreError;
use crate::layout::{read_optional, write_atomic};
use crate::sync::{BundleSync, RetryPolicy, fetch_with_retry};
use camino::{Utf8Path, Utf8PathBuf};
use imagegate_domain::parse_bundle_json;
use imagegate_types::{BundleDocument, PolicyBundle};
use std::fs;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Where the bundle used for a run came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BundleOrigin {
    Synced,
    Cache,
    /// Sync failed with a retryable network error and the cached copy was used instead.
    CacheFallback { reason: String },
    File(Utf8PathBuf),
}

/// The locally cached bundle (`<policy_dir>/bundle.json`).
///
/// The cache only ever holds a validated bundle: downloads and imports are validated before they
/// are written, and writes are atomic.
#[derive(Clone, Debug)]
pub struct BundleStore {
    cache_path: Utf8PathBuf,
}

impl BundleStore {
    pub fn new(cache_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    pub fn cache_path(&self) -> &Utf8Path {
        &self.cache_path
    }

    /// The cached bundle, or `None` when nothing has been synced yet.
    pub fn load_cached(&self) -> Result<Option<PolicyBundle>, StoreError> {
        let Some(text) = read_optional(&self.cache_path)? else {
            return Ok(None);
        };
        parse_bundle_json(text.as_bytes())
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: self.cache_path.clone(),
                message: e.to_string(),
            })
    }

    /// Load and validate a bundle file without touching the cache.
    pub fn load_file(&self, path: &Utf8Path) -> Result<PolicyBundle, StoreError> {
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        Ok(parse_bundle_json(&bytes)?)
    }

    /// Validate raw bundle bytes, stamp `synced_at`, and write them to the cache.
    pub fn import(&self, bytes: &[u8], now: OffsetDateTime) -> Result<PolicyBundle, StoreError> {
        let mut bundle = parse_bundle_json(bytes)?;
        bundle.synced_at = Some(now);
        self.save(&bundle)?;
        Ok(bundle)
    }

    pub fn save(&self, bundle: &PolicyBundle) -> Result<(), StoreError> {
        write_bundle(&self.cache_path, bundle)?;
        info!(bundle_id = %bundle.id, path = %self.cache_path, "policy bundle cached");
        Ok(())
    }

    /// Fetch, validate, and cache the remote bundle. The cache is untouched on any failure.
    pub fn sync(
        &self,
        sync: &dyn BundleSync,
        tokens: &dyn TokenProvider,
        bundle_id: &str,
        retry: &RetryPolicy,
        now: OffsetDateTime,
    ) -> Result<PolicyBundle, StoreError> {
        let bytes = fetch_with_retry(sync, tokens, bundle_id, retry)?;
        self.import(&bytes, now)
    }

    /// Sync, falling back to the cached bundle when the network is unavailable.
    ///
    /// Auth failures and invalid downloads are not masked by the cache.
    pub fn sync_or_cached(
        &self,
        sync: &dyn BundleSync,
        tokens: &dyn TokenProvider,
        bundle_id: &str,
        retry: &RetryPolicy,
        now: OffsetDateTime,
    ) -> Result<(PolicyBundle, BundleOrigin), StoreError> {
        match self.sync(sync, tokens, bundle_id, retry, now) {
            Ok(bundle) => Ok((bundle, BundleOrigin::Synced)),
            Err(err @ StoreError::Network { .. }) => match self.load_cached()? {
                Some(bundle) => {
                    warn!(error = %err, bundle_id = %bundle.id, "bundle sync failed; using cached bundle");
                    Ok((
                        bundle,
                        BundleOrigin::CacheFallback {
                            reason: err.to_string(),
                        },
                    ))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

/// Write a validated bundle as pretty JSON.
pub fn write_bundle(path: &Utf8Path, bundle: &PolicyBundle) -> Result<(), StoreError> {
    let doc = BundleDocument::from(bundle);
    let mut bytes = serde_json::to_vec_pretty(&doc).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}
