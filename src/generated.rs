//! Files produced by the renderers.
//!
//! Renderers never touch the filesystem; they return [`GeneratedFile`]s and
//! the runner writes them.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// A rendered file and its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Destination path.
    pub path: Utf8PathBuf,
    /// Complete file contents.
    pub contents: String,
}

impl GeneratedFile {
    /// Pair `contents` with `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// Errors raised while rendering a resolved root.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    /// A CMake root does not produce a linkable artefact.
    #[error("`{id}` ({kind}) cannot be a CMake root: only linkable targets can")]
    #[diagnostic(
        code(gnbridge::render::not_linkable),
        help("use an executable, shared_library, loadable_module or static_library target")
    )]
    NotLinkable {
        /// Label of the root.
        id: String,
        /// GN kind of the root.
        kind: String,
    },

    /// A root carries no `output_path` metadata.
    #[error("`{id}` has no `output_path` metadata")]
    #[diagnostic(code(gnbridge::render::missing_output_path))]
    MissingOutputPath {
        /// Label of the root.
        id: String,
    },

    /// A podspec root carries no `output_name` metadata.
    #[error("`{id}` has no `output_name` metadata to name the podspec file")]
    #[diagnostic(code(gnbridge::render::missing_output_name))]
    MissingOutputName {
        /// Label of the root.
        id: String,
    },
}
