//! Error types for subspec flattening.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building or flattening subspecs.
#[derive(Debug, Error, Diagnostic)]
pub enum FlattenError {
    /// A label referenced by a subspec is absent from the graph.
    #[error("{}", describe_unknown(.id, .dependent.as_deref()))]
    #[diagnostic(code(gnbridge::flatten::unknown_target))]
    UnknownTarget {
        /// The missing label.
        id: String,
        /// Label of the referencing node, `None` for a requested root.
        dependent: Option<String>,
    },

    /// A node reaches itself through `flatten_deps`.
    #[error("flatten_deps form a cycle: {}", .chain.join(" -> "))]
    #[diagnostic(
        code(gnbridge::flatten::cyclic_flatten),
        help("a subspec cannot fold itself in, directly or through other subspecs")
    )]
    CyclicFlatten {
        /// Labels from the requesting node back to the repeated one.
        chain: Vec<String>,
    },

    /// A `flatten_deps` entry is not marked `is_subspec_target`.
    #[error("`{id}` cannot be flattened into `{dependent}`: it is not a subspec target")]
    #[diagnostic(
        code(gnbridge::flatten::illegal_flatten_target),
        help("only targets with `is_subspec_target = true` may appear in flatten_deps")
    )]
    IllegalFlattenTarget {
        /// The offending `flatten_deps` entry.
        id: String,
        /// Label of the requesting node.
        dependent: String,
    },

    /// A subspec nests one of its own ancestors.
    #[error("nested subspecs form a cycle: {}", .chain.join(" -> "))]
    #[diagnostic(code(gnbridge::flatten::cyclic_subspec))]
    CyclicSubspec {
        /// Labels from the podspec root back to the repeated one.
        chain: Vec<String>,
    },
}

fn describe_unknown(id: &str, dependent: Option<&str>) -> String {
    dependent.map_or_else(
        || format!("unknown podspec target `{id}`"),
        |by| format!("unknown target `{id}` referenced by `{by}`"),
    )
}
