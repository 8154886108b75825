//! Error types for the graph store.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while loading or querying the graph store.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The project description is not valid JSON or lacks required keys.
    #[error("failed to parse project description")]
    #[diagnostic(code(gnbridge::graph::parse))]
    Parse {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A referenced target id is absent from the store.
    #[error("unknown target `{id}`")]
    #[diagnostic(
        code(gnbridge::graph::unknown_target),
        help("check that the label is spelled exactly as in the project JSON, toolchain suffix included")
    )]
    UnknownTarget {
        /// The missing label.
        id: String,
    },

    /// A recognised metadata key holds a value of the wrong shape.
    #[error("target `{target}` has malformed metadata `{key}`: {reason}")]
    #[diagnostic(code(gnbridge::graph::malformed_metadata))]
    MalformedMetadata {
        /// Label of the offending target.
        target: String,
        /// Metadata key that failed to parse.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },
}
