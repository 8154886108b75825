//! Writing generated files.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

/// Write `contents` to `path` atomically and log the file's location.
///
/// The text goes to a temporary file in the destination directory which then
/// replaces `path`, so readers never observe a partially written file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written.
pub(super) fn write_file(path: &Utf8Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {parent}"))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {parent}"))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {path}"))?;
    tmp.persist(path)
        .with_context(|| format!("failed to move generated file into place at {path}"))?;
    info!(%path, "wrote generated file");
    Ok(())
}
