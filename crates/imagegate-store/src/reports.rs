use crate::error::StoreError;
use crate::layout::{ANALYSIS_REPORT_FILE, image_dir, read_optional};
use camino::{Utf8Path, Utf8PathBuf};
use imagegate_types::AnalysisReport;
use tracing::debug;
use walkdir::WalkDir;

/// An image known to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEntry {
    pub image_id: String,
    /// Whether an analysis report exists for the image.
    pub analyzed: bool,
}

/// Read-only access to analysis reports. The engine never writes through this interface.
pub trait AnalysisReportReader: Send + Sync {
    fn load(&self, image_id: &str) -> Result<AnalysisReport, StoreError>;

    /// Every known image, sorted by id.
    fn list(&self) -> Result<Vec<ImageEntry>, StoreError>;

    /// Resolve a user-supplied name to an image id: an exact id, a unique id prefix, or a current
    /// tag (`name` alone also matches `name:latest`).
    fn resolve_name(&self, name: &str) -> Result<String, StoreError> {
        let entries = self.list()?;
        let bare = name.strip_prefix("sha256:").unwrap_or(name);

        if entries.iter().any(|e| e.image_id == name) {
            return Ok(name.to_string());
        }

        let by_prefix: Vec<&ImageEntry> = entries
            .iter()
            .filter(|e| {
                let id = e.image_id.strip_prefix("sha256:").unwrap_or(&e.image_id);
                !bare.is_empty() && id.starts_with(bare)
            })
            .collect();
        match by_prefix.as_slice() {
            [one] => return Ok(one.image_id.clone()),
            [] => {}
            many => {
                return Err(StoreError::Ambiguous {
                    name: name.to_string(),
                    candidates: many.iter().map(|e| e.image_id.clone()).collect(),
                });
            }
        }

        let wanted = with_default_tag(name);
        let mut by_tag = Vec::new();
        for entry in entries.iter().filter(|e| e.analyzed) {
            let report = self.load(&entry.image_id)?;
            if report
                .current_tags
                .iter()
                .any(|t| t == name || with_default_tag(t) == wanted)
            {
                by_tag.push(entry.image_id.clone());
            }
        }
        match by_tag.len() {
            0 => Err(StoreError::NotFound {
                what: format!("image '{name}'"),
            }),
            1 => Ok(by_tag.remove(0)),
            _ => Err(StoreError::Ambiguous {
                name: name.to_string(),
                candidates: by_tag,
            }),
        }
    }
}

/// `repo` → `repo:latest`; references that already carry a tag or digest are unchanged.
fn with_default_tag(name: &str) -> String {
    let last = name.rsplit('/').next().unwrap_or(name);
    if last.contains(':') || name.contains('@') {
        name.to_string()
    } else {
        format!("{name}:latest")
    }
}

/// Reports laid out as `<root>/<image_id>/analysis_report.json`.
#[derive(Clone, Debug)]
pub struct FsReportReader {
    root: Utf8PathBuf,
}

impl FsReportReader {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn report_path(&self, image_id: &str) -> Utf8PathBuf {
        image_dir(&self.root, image_id).join(ANALYSIS_REPORT_FILE)
    }
}

impl AnalysisReportReader for FsReportReader {
    fn load(&self, image_id: &str) -> Result<AnalysisReport, StoreError> {
        let path = self.report_path(image_id);
        debug!(image = %image_id, path = %path, "loading analysis report");
        let text = read_optional(&path)?.ok_or_else(|| StoreError::NotFound {
            what: format!("analysis report for image {image_id}"),
        })?;
        let report: AnalysisReport =
            serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if report.image_id != image_id {
            return Err(StoreError::Corrupt {
                path,
                message: format!(
                    "report is for image {} but is stored under {image_id}",
                    report.image_id
                ),
            });
        }
        Ok(report)
    }

    fn list(&self) -> Result<Vec<ImageEntry>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .and_then(Utf8Path::from_path)
                    .map(Utf8Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                StoreError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(image_id) = entry.file_name().to_str() else {
                continue;
            };
            out.push(ImageEntry {
                image_id: image_id.to_string(),
                analyzed: self.report_path(image_id).is_file(),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tag_is_added_only_when_missing() {
        assert_eq!(with_default_tag("nginx"), "nginx:latest");
        assert_eq!(with_default_tag("nginx:1.25"), "nginx:1.25");
        assert_eq!(with_default_tag("localhost:5000/app"), "localhost:5000/app:latest");
        assert_eq!(with_default_tag("app@sha256:ab"), "app@sha256:ab");
    }
}
