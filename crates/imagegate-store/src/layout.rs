use crate::error::StoreError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;

pub const ANALYSIS_REPORT_FILE: &str = "analysis_report.json";
pub const IMAGE_POLICY_FILE: &str = "gate_policy";
pub const EVAL_CACHE_FILE: &str = "gates_eval.json";

pub(crate) fn image_dir(store: &Utf8Path, image_id: &str) -> Utf8PathBuf {
    store.join(image_id)
}

/// Write `bytes` to `path` through a temporary file in the same directory and a rename, so readers
/// see either the old contents or the new ones.
pub fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

pub(crate) fn read_optional(path: &Utf8Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(tmp.path()).expect("utf8 tempdir");
        let path = root.join("a/b/file.json");

        write_atomic(&path, b"one").expect("first write");
        write_atomic(&path, b"two").expect("second write");
        assert_eq!(read_optional(&path).expect("read").as_deref(), Some("two"));
        assert_eq!(read_optional(&root.join("missing")).expect("read"), None);

        let leftovers: Vec<_> = fs::read_dir(root.join("a/b"))
            .expect("list")
            .collect();
        assert_eq!(leftovers.len(), 1);
    }
}
