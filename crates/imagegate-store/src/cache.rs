use crate::error::StoreError;
use crate::layout::{EVAL_CACHE_FILE, image_dir, read_optional, write_atomic};
use camino::{Utf8Path, Utf8PathBuf};
use imagegate_types::EvaluationResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use time::OffsetDateTime;
use tracing::debug;

/// What a cached result must have been computed from to be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheKey<'a> {
    pub policy_digest: &'a str,
    /// `analyzed_at` of the image report being evaluated.
    pub analyzed_at: OffsetDateTime,
    /// `analyzed_at` of the base report; `None` unless base-dependent rules use one.
    pub base_analyzed_at: Option<OffsetDateTime>,
}

impl CacheKey<'_> {
    pub fn matches(&self, result: &EvaluationResult) -> bool {
        !result.policy_digest.is_empty()
            && result.policy_digest == self.policy_digest
            && result.analyzed_at == Some(self.analyzed_at)
            && result.base_analyzed_at == self.base_analyzed_at
    }
}

/// Last evaluation result per image, stored as `<root>/<image_id>/gates_eval.json`.
///
/// Access is serialized per image id: reads of one image share a lock, a write excludes them.
/// Different images never contend. A lock lives only while some caller holds it, so the lock
/// table stays bounded by the number of in-flight images.
#[derive(Debug)]
pub struct EvalCache {
    root: Utf8PathBuf,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl EvalCache {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path(&self, image_id: &str) -> Utf8PathBuf {
        image_dir(&self.root, image_id).join(EVAL_CACHE_FILE)
    }

    fn with_lock<T>(&self, image_id: &str, exclusive: bool, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                locks
                    .entry(image_id.to_string())
                    .or_insert_with(|| Arc::new(RwLock::new(()))),
            )
        };

        let out = if exclusive {
            let _guard = lock.write().unwrap_or_else(|e| e.into_inner());
            f()
        } else {
            let _guard = lock.read().unwrap_or_else(|e| e.into_inner());
            f()
        };

        // Clones are only handed out under the table mutex, so a count of one here means no
        // other caller holds or is about to hold this lock.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        drop(lock);
        if locks
            .get(image_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(image_id);
        }
        out
    }

    pub fn get(&self, image_id: &str) -> Result<Option<EvaluationResult>, StoreError> {
        self.with_lock(image_id, false, || {
            let path = self.path(image_id);
            let Some(text) = read_optional(&path)? else {
                return Ok(None);
            };
            serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    path,
                    message: e.to_string(),
                })
        })
    }

    /// The cached result, only if it was produced under the same policy from the same reports.
    pub fn get_current(
        &self,
        image_id: &str,
        key: &CacheKey<'_>,
    ) -> Result<Option<EvaluationResult>, StoreError> {
        let cached = self.get(image_id)?;
        Ok(cached.filter(|r| key.matches(r)))
    }

    /// Replace the cached result wholesale.
    pub fn put(&self, result: &EvaluationResult) -> Result<(), StoreError> {
        self.with_lock(&result.image_id, true, || {
            let path = self.path(&result.image_id);
            let bytes = serde_json::to_vec_pretty(result).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
            write_atomic(&path, &bytes)?;
            debug!(image = %result.image_id, final_action = %result.final_action, "cached evaluation");
            Ok(())
        })
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
