use crate::error::StoreError;
use crate::layout::{IMAGE_POLICY_FILE, image_dir, read_optional, write_atomic};
use camino::{Utf8Path, Utf8PathBuf};
use imagegate_settings::{parse_policy_text, render_policy_text};
use imagegate_types::GateRule;
use std::fs;
use tracing::info;

/// Per-image gate policies stored as `<root>/<image_id>/gate_policy` in the legacy text format.
#[derive(Clone, Debug)]
pub struct ImagePolicyStore {
    root: Utf8PathBuf,
}

impl ImagePolicyStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, image_id: &str) -> Utf8PathBuf {
        image_dir(&self.root, image_id).join(IMAGE_POLICY_FILE)
    }

    pub fn load(&self, image_id: &str) -> Result<Option<Vec<GateRule>>, StoreError> {
        let path = self.path(image_id);
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };
        parse_policy_text(&text)
            .map(Some)
            .map_err(|source| StoreError::Policy { path, source })
    }

    pub fn save(&self, image_id: &str, rules: &[GateRule]) -> Result<(), StoreError> {
        let path = self.path(image_id);
        write_atomic(&path, render_policy_text(rules).as_bytes())?;
        info!(image = %image_id, rules = rules.len(), "stored image policy");
        Ok(())
    }

    /// Returns whether a policy existed.
    pub fn remove(&self, image_id: &str) -> Result<bool, StoreError> {
        let path = self.path(image_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(image = %image_id, "removed image policy");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}
