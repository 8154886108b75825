//! Subspec tree of a podspec root.
//!
//! The root's dependencies, sorted, become subspecs and its `condition_deps`
//! become conditional subspecs. Every subspec is flattened before its own
//! nested and conditional subspecs are expanded.

use tracing::debug;

use super::{FlattenError, SubspecSpec, flatten_target, lookup};
use crate::graph::metadata::ConditionalDep;
use crate::graph::{Graph, GraphNode};

/// A flattened subspec and the subspecs nested in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubspecTree {
    /// Attributes of this subspec.
    pub spec: SubspecSpec,
    /// Subspecs emitted under a condition, in declaration order.
    pub conditional: Vec<ConditionalSubspec>,
    /// Nested subspecs in label order.
    pub children: Vec<SubspecTree>,
}

/// A subspec gated by a global variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalSubspec {
    /// Name of the global variable.
    pub condition: String,
    /// The gated subspec.
    pub subspec: SubspecTree,
}

/// Everything needed to render one podspec.
#[derive(Debug, Clone)]
pub struct PodspecTree<'g> {
    /// The podspec root node.
    pub root: &'g GraphNode,
    /// Top-level subspecs in label order.
    pub subspecs: Vec<SubspecTree>,
    /// Top-level conditional subspecs in declaration order.
    pub conditional: Vec<ConditionalSubspec>,
}

/// Build the subspec tree below `root_id`.
///
/// # Errors
///
/// Returns [`FlattenError::CyclicSubspec`] when a subspec nests one of its
/// ancestors, and any error raised while flattening a subspec.
pub fn podspec_tree<'g>(graph: &'g Graph, root_id: &str) -> Result<PodspecTree<'g>, FlattenError> {
    let root = lookup(graph, root_id, None)?;
    let mut builder = Builder {
        graph,
        chain: vec![root.id.clone()],
    };
    let mut deps: Vec<&String> = root.deps.iter().collect();
    deps.sort();
    deps.dedup();
    let subspecs = deps
        .into_iter()
        .map(|id| builder.subspec(id, &root.id))
        .collect::<Result<Vec<_>, _>>()?;
    let conditional = builder.conditional(&root.metadata.podspec.condition_deps, &root.id)?;
    debug!(root = root_id, subspecs = subspecs.len(), "built podspec tree");
    Ok(PodspecTree {
        root,
        subspecs,
        conditional,
    })
}

struct Builder<'g> {
    graph: &'g Graph,
    chain: Vec<String>,
}

impl Builder<'_> {
    fn subspec(&mut self, id: &str, parent: &str) -> Result<SubspecTree, FlattenError> {
        if self.chain.iter().any(|ancestor| ancestor == id) {
            let mut chain = self.chain.clone();
            chain.push(id.to_owned());
            return Err(FlattenError::CyclicSubspec { chain });
        }
        let node = lookup(self.graph, id, Some(parent))?;
        let spec = flatten_target(self.graph, node)?;
        self.chain.push(id.to_owned());
        let conditional = self.conditional(&spec.condition_deps, id)?;
        let children = spec
            .subspecs
            .iter()
            .map(|child| self.subspec(child, id))
            .collect::<Result<Vec<_>, _>>()?;
        self.chain.pop();
        Ok(SubspecTree {
            spec,
            conditional,
            children,
        })
    }

    fn conditional(
        &mut self,
        deps: &[ConditionalDep],
        parent: &str,
    ) -> Result<Vec<ConditionalSubspec>, FlattenError> {
        deps.iter()
            .map(|dep| {
                Ok(ConditionalSubspec {
                    condition: dep.condition.clone(),
                    subspec: self.subspec(&dep.target, parent)?,
                })
            })
            .collect()
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
    fn builds_sorted_and_conditional_subspecs() {
        let graph = graph(json!({
            "//pod:Lib": {
                "type": "group",
                "deps": ["//pod:b", "//pod:a"],
                "metadata": { "condition_deps": [["//pod:debug", "enable_debug"]] },
            },
            "//pod:a": {
                "type": "source_set",
                "deps": ["//pod:inner"],
                "metadata": { "is_subspec_target": [true], "output_name": ["A"] },
            },
            "//pod:inner": {
                "type": "source_set",
                "metadata": { "is_subspec_target": [true], "output_name": ["Inner"] },
            },
            "//pod:b": { "type": "source_set", "metadata": { "output_name": ["B"] } },
            "//pod:debug": { "type": "source_set", "metadata": { "output_name": ["Debug"] } },
        }));
        let tree = podspec_tree(&graph, "//pod:Lib").expect("tree");
        let names: Vec<_> = tree.subspecs.iter().map(|sub| sub.spec.output_name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        let a = tree.subspecs.first().expect("A");
        assert_eq!(a.children.len(), 1);
        let conditional = tree.conditional.first().expect("conditional");
        assert_eq!(conditional.condition, "enable_debug");
        assert_eq!(conditional.subspec.spec.output_name, "Debug");
    }

    #[rstest]
    fn nested_subspec_cycles_are_rejected() {
        let graph = graph(json!({
            "//pod:Lib": { "type": "group", "deps": ["//pod:a"] },
            "//pod:a": {
                "type": "source_set",
                "deps": ["//pod:b"],
                "metadata": { "is_subspec_target": [true] },
            },
            "//pod:b": {
                "type": "source_set",
                "deps": ["//pod:a"],
                "metadata": { "is_subspec_target": [true] },
            },
        }));
        let err = podspec_tree(&graph, "//pod:Lib").expect_err("cycle");
        match err {
            FlattenError::CyclicSubspec { chain } => {
                assert_eq!(chain, ["//pod:Lib", "//pod:a", "//pod:b", "//pod:a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn unknown_subspec_names_its_parent() {
        let graph = graph(json!({
            "//pod:Lib": { "type": "group", "deps": ["//pod:gone"] },
        }));
        let err = podspec_tree(&graph, "//pod:Lib").expect_err("unknown");
        assert!(matches!(
            err,
            FlattenError::UnknownTarget { ref id, dependent: Some(ref parent) }
                if id == "//pod:gone" && parent == "//pod:Lib"
        ));
    }
}
