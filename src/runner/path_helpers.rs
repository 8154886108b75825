//! Path resolution helpers for the runner module.
//!
//! Centralises how command line and metadata paths are interpreted so the
//! main runner module stays focused on command dispatch.

use crate::cli::Cli;
use camino::{Utf8Path, Utf8PathBuf};
use std::borrow::Cow;
use std::path::Path;

use super::RunnerError;

/// Convert a command line path to UTF-8.
///
/// # Errors
/// Returns [`RunnerError::NonUtf8Path`] when `path` is not valid UTF-8.
pub(super) fn utf8_path(path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|raw| RunnerError::NonUtf8Path {
        path: raw.display().to_string(),
    })
}

/// Resolve a command line path against the CLI's directory option.
///
/// # Errors
/// Returns [`RunnerError::NonUtf8Path`] when the path or the directory is not
/// valid UTF-8.
pub(super) fn resolve_input_path(cli: &Cli, path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    let file = utf8_path(path)?;
    match &cli.directory {
        Some(dir) if file.is_relative() => Ok(utf8_path(dir)?.join(file)),
        _ => Ok(file),
    }
}

/// Resolve an output path relative to the CLI working directory.
///
/// The `-C/--directory` option behaves like a working directory change for
/// relative paths found in metadata as well as on the command line.
#[must_use]
pub(super) fn resolve_output_path<'a>(cli: &Cli, path: &'a Utf8Path) -> Cow<'a, Utf8Path> {
    if path.is_relative() {
        cli.directory
            .as_deref()
            .and_then(Utf8Path::from_path)
            .map_or(Cow::Borrowed(path), |dir| Cow::Owned(dir.join(path)))
    } else {
        Cow::Borrowed(path)
    }
}

/// Directory holding the project file.
#[must_use]
pub(super) fn project_dir(project: &Utf8Path) -> Utf8PathBuf {
    project
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Commands, ResolveArgs};
    use rstest::rstest;
    use std::path::PathBuf;

    fn cli(directory: Option<&str>) -> Cli {
        Cli {
            directory: directory.map(PathBuf::from),
            verbose: false,
            command: Commands::Resolve(ResolveArgs {
                project: PathBuf::from("project.json"),
                target: "//:a".to_owned(),
            }),
        }
    }

    #[rstest]
    #[case(None, "out/x", "out/x")]
    #[case(Some("/work"), "out/x", "/work/out/x")]
    #[case(Some("/work"), "/abs/x", "/abs/x")]
    fn output_paths_follow_directory(
        #[case] directory: Option<&str>,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        let resolved = resolve_output_path(&cli(directory), Utf8Path::new(path));
        assert_eq!(resolved.as_str(), expected);
    }

    #[rstest]
    fn input_paths_follow_directory() {
        let resolved = resolve_input_path(&cli(Some("/work")), Path::new("gn/project.json"))
            .expect("utf-8 path");
        assert_eq!(resolved, "/work/gn/project.json");
    }

    #[rstest]
    #[case("gn/project.json", "gn")]
    #[case("project.json", ".")]
    fn project_dir_defaults_to_current(#[case] project: &str, #[case] expected: &str) {
        assert_eq!(project_dir(Utf8Path::new(project)), expected);
    }
}
