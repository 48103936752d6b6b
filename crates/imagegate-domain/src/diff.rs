//! Package and file deltas between an image and its base.

use imagegate_types::{AnalysisReport, ImageDiff};
use std::collections::BTreeMap;

/// Compare `image` against `base`. Output lists are sorted by name/path.
///
/// An image is never diffed against itself: equal ids give an empty diff.
pub fn diff(image: &AnalysisReport, base: &AnalysisReport) -> ImageDiff {
    let mut out = ImageDiff {
        image_id: image.image_id.clone(),
        base_id: base.image_id.clone(),
        ..ImageDiff::default()
    };
    if image.image_id == base.image_id {
        return out;
    }

    for (name, meta) in &image.packages {
        match base.packages.get(name) {
            None => out.added_packages.push(name.clone()),
            Some(base_meta) if base_meta.version != meta.version => {
                out.changed_packages.push(name.clone())
            }
            Some(_) => {}
        }
    }
    out.removed_packages = missing_from(&base.packages, &image.packages);

    out.added_files = missing_from(&image.files, &base.files);
    out.removed_files = missing_from(&base.files, &image.files);
    out.added_suid_files = missing_from(&image.suid_files, &base.suid_files);
    out.removed_suid_files = missing_from(&base.suid_files, &image.suid_files);

    out
}

/// Keys of `left` that `right` lacks.
fn missing_from<V, W>(left: &BTreeMap<String, V>, right: &BTreeMap<String, W>) -> Vec<String> {
    left.keys()
        .filter(|k| !right.contains_key(*k))
        .cloned()
        .collect()
}

/// Added counts only, in the shape of the audit report's base diff column.
pub fn added_counts(d: &ImageDiff) -> (usize, usize, usize) {
    (
        d.added_packages.len(),
        d.added_files.len(),
        d.added_suid_files.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{report, with_files, with_packages, with_suid};

    #[test]
    fn diff_reports_each_category() {
        let base = with_suid(
            with_files(
                with_packages(report("base"), &[("bash", "5.1"), ("curl", "7.0"), ("vim", "9")]),
                &["/etc/passwd", "/tmp/old"],
            ),
            &["/usr/bin/passwd", "/usr/bin/chfn"],
        );
        let image = with_suid(
            with_files(
                with_packages(report("img"), &[("bash", "5.2"), ("curl", "7.0"), ("jq", "1.7")]),
                &["/etc/passwd", "/app/bin"],
            ),
            &["/usr/bin/passwd", "/usr/bin/sudo"],
        );

        let d = diff(&image, &base);
        assert_eq!(d.image_id, "img");
        assert_eq!(d.base_id, "base");
        assert_eq!(d.added_packages, vec!["jq"]);
        assert_eq!(d.removed_packages, vec!["vim"]);
        assert_eq!(d.changed_packages, vec!["bash"]);
        assert_eq!(d.added_files, vec!["/app/bin"]);
        assert_eq!(d.removed_files, vec!["/tmp/old"]);
        assert_eq!(d.added_suid_files, vec!["/usr/bin/sudo"]);
        assert_eq!(d.removed_suid_files, vec!["/usr/bin/chfn"]);
        assert_eq!(added_counts(&d), (1, 1, 1));
    }

    #[test]
    fn same_id_is_empty_even_if_contents_differ() {
        let a = with_packages(report("same"), &[("bash", "5.1")]);
        let b = report("same");
        let d = diff(&a, &b);
        assert!(d.is_empty());
    }
}
