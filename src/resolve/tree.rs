//! Nested-root trees.
//!
//! A root may name further roots in `sub_cmake_target_and_link` and
//! `sub_cmake_target`. Each nested root is resolved independently and its
//! output lands below the parent's, so resolving a requested root yields a
//! tree of [`ResolvedGraph`]s.

use serde::Serialize;
use tracing::debug;

use super::{PackageRequirements, ResolveError, ResolvedGraph, resolve};
use crate::graph::Graph;

/// A resolved root together with its nested roots.
#[derive(Debug, Clone)]
pub struct ResolvedTree<'g> {
    /// Resolution of this root.
    pub resolved: ResolvedGraph<'g>,
    /// Output names of nested roots this root links against.
    pub linked_outputs: Vec<&'g str>,
    /// Nested roots in emission order.
    pub children: Vec<ResolvedTree<'g>>,
}

impl ResolvedTree<'_> {
    /// Number of roots in the tree, this one included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ResolvedTree::len).sum::<usize>()
    }

    /// A tree always holds at least its own root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Resolve `root_id` and every nested root below it.
///
/// Linked nested roots come first, then plain nested roots, each group in
/// declaration order.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownTarget`] for missing labels and
/// [`ResolveError::CyclicSubproject`] when a nested root re-enters its own
/// ancestry.
pub fn resolve_tree<'g>(graph: &'g Graph, root_id: &str) -> Result<ResolvedTree<'g>, ResolveError> {
    let mut chain = Vec::new();
    build(graph, root_id, &mut chain)
}

fn build<'g>(
    graph: &'g Graph,
    root_id: &str,
    chain: &mut Vec<String>,
) -> Result<ResolvedTree<'g>, ResolveError> {
    if chain.iter().any(|ancestor| ancestor == root_id) {
        let mut cycle = chain.clone();
        cycle.push(root_id.to_owned());
        return Err(ResolveError::CyclicSubproject { chain: cycle });
    }
    let resolved = resolve(graph, root_id)?;
    let root = resolved.root;
    let cmake = &root.metadata.cmake;
    chain.push(root_id.to_owned());

    let mut children = Vec::new();
    let mut linked_outputs = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for child_id in &cmake.sub_cmake_target_and_link {
        if seen.contains(&child_id.as_str()) {
            continue;
        }
        seen.push(child_id);
        let child = build(graph, child_id, chain)?;
        let child_root = child.resolved.root;
        linked_outputs.push(child_root.output_name.as_str());
        children.push(child);
    }
    for child_id in &cmake.sub_cmake_target {
        if seen.contains(&child_id.as_str()) {
            continue;
        }
        seen.push(child_id);
        children.push(build(graph, child_id, chain)?);
    }

    chain.pop();
    debug!(root = root_id, nested = children.len(), "resolved nested roots");
    Ok(ResolvedTree {
        resolved,
        linked_outputs,
        children,
    })
}

/// Serialisable digest of a [`ResolvedTree`], printed by `gnbridge resolve`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionSummary<'a> {
    /// Root label.
    pub root: &'a str,
    /// CMake identifier of the root.
    pub identifier: &'a str,
    /// Source unit labels in lexicographic order.
    pub source_units: Vec<&'a str>,
    /// Barrier unit labels in lexicographic order.
    pub barrier_units: Vec<&'a str>,
    /// Script actions the root waits for.
    pub script_actions: Vec<&'a str>,
    /// Aggregated package requirements.
    pub packages: &'a PackageRequirements,
    /// Labels skipped for their kind.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<&'a str>,
    /// Output names of linked nested roots.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linked_outputs: Vec<&'a str>,
    /// Nested roots.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolutionSummary<'a>>,
}

impl<'a> From<&'a ResolvedTree<'_>> for ResolutionSummary<'a> {
    fn from(tree: &'a ResolvedTree<'_>) -> Self {
        let resolved = &tree.resolved;
        Self {
            root: &resolved.root.id,
            identifier: resolved.root.cmake_name(),
            source_units: resolved.source_units.keys().copied().collect(),
            barrier_units: resolved.barrier_units.keys().copied().collect(),
            script_actions: resolved
                .root_script_actions()
                .map(|actions| actions.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            packages: &resolved.packages,
            unsupported: resolved.unsupported.clone(),
            linked_outputs: tree.linked_outputs.clone(),
            children: tree.children.iter().map(ResolutionSummary::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn graph(targets: Value) -> Graph {
        let doc = json!({
            "build_settings": { "root_path": "/src", "build_dir": "//out/Default/" },
            "targets": targets,
        });
        Graph::from_json_str(&doc.to_string()).expect("graph")
    }

    #[rstest]
    fn linked_children_come_first_and_contribute_outputs() {
        let graph = graph(json!({
            "//:app": {
                "type": "shared_library",
                "sources": ["//app.cc"],
                "metadata": {
                    "sub_cmake_target": ["//:plain"],
                    "sub_cmake_target_and_link": ["//:linked"],
                },
            },
            "//:plain": { "type": "shared_library", "sources": ["//p.cc"] },
            "//:linked": { "type": "shared_library", "sources": ["//l.cc"], "output_name": "liblinked" },
        }));
        let tree = resolve_tree(&graph, "//:app").expect("tree");
        let order: Vec<_> = tree.children.iter().map(|child| child.resolved.root.id.as_str()).collect();
        assert_eq!(order, ["//:linked", "//:plain"]);
        assert_eq!(tree.linked_outputs, ["liblinked"]);
        assert_eq!(tree.len(), 3);
    }

    #[rstest]
    fn nested_root_cycles_are_rejected() {
        let graph = graph(json!({
            "//:a": { "type": "shared_library", "metadata": { "sub_cmake_target": ["//:b"] } },
            "//:b": { "type": "shared_library", "metadata": { "sub_cmake_target": ["//:a"] } },
        }));
        let err = resolve_tree(&graph, "//:a").expect_err("cycle");
        match err {
            ResolveError::CyclicSubproject { chain } => assert_eq!(chain, ["//:a", "//:b", "//:a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn summary_lists_sorted_units() {
        let graph = graph(json!({
            "//:app": {
                "type": "executable",
                "sources": ["//main.cc"],
                "deps": ["//:z", "//:a", "//:gen"],
            },
            "//:z": { "type": "source_set", "sources": ["//z.cc"] },
            "//:a": { "type": "source_set", "sources": ["//a.cc"] },
            "//:gen": { "type": "action" },
        }));
        let tree = resolve_tree(&graph, "//:app").expect("tree");
        let summary = serde_json::to_value(ResolutionSummary::from(&tree)).expect("json");
        assert_eq!(summary["source_units"], json!(["//:a", "//:app", "//:gen", "//:z"]));
        assert_eq!(summary["script_actions"], json!(["gen"]));
        assert_eq!(summary["identifier"], json!("app"));
        assert!(summary.get("children").is_none());
    }
}
