//! Target-list discovery.
//!
//! GN templates drop one file per declared root into `cmake_targets/` or
//! `podspec_targets/` next to the project description. Each non-blank line of
//! those files names a root label.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Read every target list in `dir`, in file-name order.
///
/// A missing directory yields no targets. Repeated labels are kept once, at
/// their first position.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked or a list cannot be
/// read.
pub(super) fn discover(dir: &Utf8Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        debug!(%dir, "no target-list directory");
        return Ok(Vec::new());
    }
    let mut targets: Vec<String> = Vec::new();
    for item in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = item.with_context(|| format!("failed to list {dir}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let text = fs::read_to_string(entry.path())
            .with_context(|| format!("failed to read target list {}", entry.path().display()))?;
        for label in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if !targets.iter().any(|known| known == label) {
                targets.push(label.to_owned());
            }
        }
    }
    debug!(%dir, count = targets.len(), "discovered targets");
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn reads_lists_in_file_name_order() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        fs::write(root.join("b.txt"), "//b:b\n\n//a:a\n").expect("write b");
        fs::write(root.join("a.txt"), "  //a:a  \n").expect("write a");
        fs::create_dir(root.join("nested")).expect("mkdir");
        fs::write(root.join("nested/c.txt"), "//c:c\n").expect("write c");
        assert_eq!(discover(&root).expect("discover"), ["//a:a", "//b:b"]);
    }

    #[rstest]
    fn missing_directory_yields_nothing() {
        let dir = tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().join("absent")).expect("utf-8 tempdir");
        assert!(discover(&root).expect("discover").is_empty());
    }
}
