//! Error types for dependency resolution.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

/// Errors that stop the resolution of one root.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// A root or dependency label is absent from the graph.
    #[error("{}", describe_unknown(.id, .dependent.as_deref()))]
    #[diagnostic(code(gnbridge::resolve::unknown_target))]
    UnknownTarget {
        /// The missing label.
        id: String,
        /// Label of the node that referenced it, `None` for a root.
        dependent: Option<String>,
    },

    /// A nested root lists one of its own ancestors as a nested root.
    #[error("nested CMake roots form a cycle: {}", .chain.join(" -> "))]
    #[diagnostic(code(gnbridge::resolve::cyclic_subproject))]
    CyclicSubproject {
        /// Labels from the outermost root back to the repeated one.
        chain: Vec<String>,
    },
}

fn describe_unknown(id: &str, dependent: Option<&str>) -> String {
    dependent.map_or_else(
        || format!("unknown target `{id}`"),
        |by| format!("unknown target `{id}` (dependency of `{by}`)"),
    )
}
