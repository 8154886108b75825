//! Path rewriting for generated files.
//!
//! GN paths are either source-absolute (`//base/a.cc`) or system-absolute.
//! CMake output refers to the source tree through `${ROOT_PATH}` so the
//! fragments survive a relocated checkout; podspecs use paths relative to the
//! pod root.
//!
//! ```
//! use gnbridge::paths::{PathRewriter, pod_relative};
//!
//! let rewriter = PathRewriter::new("/src");
//! assert_eq!(rewriter.symbolic("//base/a.cc"), "${ROOT_PATH}/base/a.cc");
//! assert_eq!(rewriter.symbolic("/usr/lib"), "/usr/lib");
//! assert_eq!(pod_relative("//build/secondary/third_party/x.h"), "third_party/x.h");
//! ```

use camino::{Utf8Path, Utf8PathBuf};

/// CMake variable holding the source root.
pub const ROOT_PATH_VAR: &str = "${ROOT_PATH}";

const SECONDARY_PREFIX: &str = "build/secondary/";

/// Rewrites GN paths against a source root.
#[derive(Debug, Clone, Copy)]
pub struct PathRewriter<'a> {
    root: &'a str,
}

impl<'a> PathRewriter<'a> {
    /// Create a rewriter for `root_path`.
    #[must_use]
    pub fn new(root_path: &'a str) -> Self {
        Self {
            root: root_path.trim_end_matches('/'),
        }
    }

    /// Resolve a source-absolute path against the root.
    #[must_use]
    pub fn absolute(&self, path: &str) -> String {
        path.strip_prefix("//")
            .map_or_else(|| path.to_owned(), |rest| format!("{}/{rest}", self.root))
    }

    /// Resolve `path` and substitute the root with [`ROOT_PATH_VAR`].
    #[must_use]
    pub fn symbolic(&self, path: &str) -> String {
        let absolute = self.absolute(path);
        if self.root.is_empty() {
            return absolute;
        }
        match absolute.strip_prefix(self.root) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                format!("{ROOT_PATH_VAR}{rest}")
            }
            _ => absolute,
        }
    }

    /// [`Self::symbolic`] over a list, keeping order.
    #[must_use]
    pub fn symbolic_all<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        paths.iter().map(|path| self.symbolic(path.as_ref())).collect()
    }
}

/// Strip the source-absolute marker and the secondary build prefix.
#[must_use]
pub fn pod_relative(path: &str) -> String {
    let stripped = path.replace("//", "");
    stripped
        .strip_prefix(SECONDARY_PREFIX)
        .map_or(stripped.clone(), str::to_owned)
}

/// [`pod_relative`] over a list, sorted.
#[must_use]
pub fn pod_relative_sorted<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let mut relative: Vec<String> = paths.iter().map(|path| pod_relative(path.as_ref())).collect();
    relative.sort();
    relative
}

/// Location of the helper scripts invoked by generated custom commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperScripts {
    dir: Utf8PathBuf,
}

impl HelperScripts {
    /// Helper scripts living in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the scripts.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Script copying `copy` target sources to their outputs.
    #[must_use]
    pub fn copy_files(&self) -> Utf8PathBuf {
        self.dir.join("copy_files.py")
    }

    /// Script running an `action_foreach` script once per source.
    #[must_use]
    pub fn action_foreach_files(&self) -> Utf8PathBuf {
        self.dir.join("action_foreach_files.py")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/src", "//a/b.cc", "${ROOT_PATH}/a/b.cc")]
    #[case("/src/", "//a/b.cc", "${ROOT_PATH}/a/b.cc")]
    #[case("/src", "/src/out/gen.h", "${ROOT_PATH}/out/gen.h")]
    #[case("/src", "relative/x", "relative/x")]
    #[case("", "//a", "/a")]
    #[case("/src", "/src", "${ROOT_PATH}")]
    #[case("/src", "/usr/src/lib", "/usr/src/lib")]
    #[case("/src", "/srcgen/x", "/srcgen/x")]
    fn rewrites_to_root_variable(#[case] root: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(PathRewriter::new(root).symbolic(path), expected);
    }

    #[rstest]
    #[case("//core/a.h", "core/a.h")]
    #[case("//build/secondary/third_party/b.cc", "third_party/b.cc")]
    #[case("plain/c.mm", "plain/c.mm")]
    fn strips_pod_prefixes(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(pod_relative(path), expected);
    }

    #[rstest]
    fn helper_scripts_live_in_one_directory() {
        let scripts = HelperScripts::new("/tools/gn");
        assert_eq!(scripts.copy_files(), "/tools/gn/copy_files.py");
        assert_eq!(scripts.action_foreach_files(), "/tools/gn/action_foreach_files.py");
    }
}
