//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. The unused_assignments lint fires in some
// Rust versions but not others. Since `#[expect]` fails when the lint doesn't
// fire, and `unfulfilled_lint_expectations` cannot be expected, we must use
// `#[allow]` here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// No root was named and the target-list directory yields none.
    #[error("no {kind} targets requested and none listed in {directory}")]
    #[diagnostic(
        code(gnbridge::runner::no_targets),
        help("pass target labels on the command line or list them one per line in {directory}")
    )]
    NoTargets {
        /// Generator the targets were wanted for.
        kind: &'static str,
        /// Directory searched for target lists.
        directory: Utf8PathBuf,
    },

    /// A path given on the command line is not valid UTF-8.
    #[error("path {path} is not valid UTF-8")]
    #[diagnostic(code(gnbridge::runner::non_utf8_path))]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// Some roots failed; each failure was logged as it happened.
    #[error("{failed} of {total} roots failed")]
    #[diagnostic(
        code(gnbridge::runner::roots_failed),
        help("run with --verbose for the resolution trace of each root")
    )]
    RootsFailed {
        /// Number of failed roots.
        failed: usize,
        /// Number of roots attempted.
        total: usize,
    },
}
