//! Dependency resolution.
//!
//! Starting from one root, [`resolve`] walks the dependency graph depth-first
//! and partitions every reachable node into source units (compiled into the
//! root) and barrier units (linked as finished artefacts). Script actions are
//! collected per node so the renderer can declare build-order dependencies,
//! and external package requirements are aggregated along the way.
//!
//! Each call owns its own visit memo: a node is expanded at most once, and a
//! revisit reuses the script actions recorded for it, which keeps cyclic
//! `deps` finite.
//!
//! # Examples
//!
//! ```
//! use gnbridge::graph::Graph;
//! use gnbridge::resolve::resolve;
//!
//! let graph = Graph::from_json_str(r#"{
//!     "build_settings": { "root_path": "/src", "build_dir": "//out/" },
//!     "targets": {
//!         "//:app": { "type": "executable", "sources": ["//main.cc"], "deps": ["//:util"] },
//!         "//:util": { "type": "source_set", "sources": ["//util.cc"] }
//!     }
//! }"#).expect("graph");
//! let resolved = resolve(&graph, "//:app").expect("resolve");
//! assert_eq!(resolved.source_units.keys().copied().collect::<Vec<_>>(), ["//:app", "//:util"]);
//! ```

mod error;
pub mod packages;
mod tree;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::graph::{Classification, Graph, GraphError, GraphNode};

pub use error::ResolveError;
pub use packages::{PackageRequirement, PackageRequirements};
pub use tree::{ResolutionSummary, ResolvedTree, resolve_tree};

/// The resolved dependency structure of one root.
#[derive(Debug, Clone)]
pub struct ResolvedGraph<'g> {
    /// The root the walk started from.
    pub root: &'g GraphNode,
    /// Nodes compiled into the root, keyed by label.
    pub source_units: BTreeMap<&'g str, &'g GraphNode>,
    /// Finished artefacts the root links against, keyed by label.
    pub barrier_units: BTreeMap<&'g str, &'g GraphNode>,
    /// Transitive script actions of every expanded node, keyed by label.
    pub script_actions: BTreeMap<&'g str, BTreeSet<String>>,
    /// External packages required by the root and its source units.
    pub packages: PackageRequirements,
    /// Labels skipped because their kind is unsupported.
    pub unsupported: Vec<&'g str>,
}

impl<'g> ResolvedGraph<'g> {
    fn new(root: &'g GraphNode) -> Self {
        Self {
            root,
            source_units: BTreeMap::new(),
            barrier_units: BTreeMap::new(),
            script_actions: BTreeMap::new(),
            packages: PackageRequirements::default(),
            unsupported: Vec::new(),
        }
    }

    /// Script actions the root must wait for.
    #[must_use]
    pub fn root_script_actions(&self) -> Option<&BTreeSet<String>> {
        self.script_actions.get(self.root.id.as_str())
    }

    /// Script actions a node must wait for.
    #[must_use]
    pub fn script_actions_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.script_actions.get(id)
    }

    /// Modules linked from external packages.
    #[must_use]
    pub fn linked_modules(&self) -> BTreeSet<&str> {
        self.packages.linked_modules()
    }

    /// Whether `id` is the root or one of its source units.
    #[must_use]
    pub fn emits(&self, id: &str) -> bool {
        self.root.id == id || self.source_units.contains_key(id)
    }
}

/// Resolve the dependency structure below `root_id`.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownTarget`] when the root or any reachable
/// dependency label is absent from the graph.
pub fn resolve<'g>(graph: &'g Graph, root_id: &str) -> Result<ResolvedGraph<'g>, ResolveError> {
    let root = graph.lookup(root_id).map_err(|err| unknown(err, None))?;
    let mut walk = Walk {
        graph,
        visited: HashSet::new(),
        resolved: ResolvedGraph::new(root),
    };
    walk.visited.insert(root.id.as_str());
    if root.classify() == Classification::Unsupported {
        walk.skip_unsupported(root);
        return Ok(walk.resolved);
    }
    if root.is_useful() {
        walk.resolved.source_units.insert(root.id.as_str(), root);
    }
    walk.resolved
        .packages
        .merge(&PackageRequirements::from_specs(&root.metadata.cmake.find_and_link_packages));
    walk.expand(root)?;
    debug!(
        root = %root.id,
        sources = walk.resolved.source_units.len(),
        barriers = walk.resolved.barrier_units.len(),
        "resolved dependency graph",
    );
    Ok(walk.resolved)
}

fn unknown(err: GraphError, dependent: Option<&str>) -> ResolveError {
    let id = match err {
        GraphError::UnknownTarget { id } => id,
        other => other.to_string(),
    };
    ResolveError::UnknownTarget {
        id,
        dependent: dependent.map(str::to_owned),
    }
}

/// State of one resolution. Never shared between roots.
struct Walk<'g> {
    graph: &'g Graph,
    visited: HashSet<&'g str>,
    resolved: ResolvedGraph<'g>,
}

impl<'g> Walk<'g> {
    fn skip_unsupported(&mut self, node: &'g GraphNode) {
        warn!(
            label = %node.id,
            kind = node.raw_kind.as_deref().unwrap_or("<none>"),
            "skipping target with unsupported kind",
        );
        self.resolved.unsupported.push(node.id.as_str());
    }

    /// Visit a dependency, returning the script actions it contributes.
    fn visit(&mut self, node: &'g GraphNode) -> Result<BTreeSet<String>, ResolveError> {
        if !self.visited.insert(node.id.as_str()) {
            return Ok(self
                .resolved
                .script_actions
                .get(node.id.as_str())
                .cloned()
                .unwrap_or_default());
        }
        match node.classify() {
            Classification::Unsupported => {
                self.skip_unsupported(node);
                return Ok(BTreeSet::new());
            }
            Classification::Barrier => {
                debug!(label = %node.id, "barrier reached");
                self.resolved.barrier_units.insert(node.id.as_str(), node);
                return Ok(BTreeSet::new());
            }
            Classification::Script | Classification::SourceUnit => {}
        }
        if node.is_useful() {
            self.resolved.source_units.insert(node.id.as_str(), node);
            self.resolved
                .packages
                .merge(&PackageRequirements::from_specs(&node.metadata.cmake.find_and_link_packages));
        }
        self.expand(node)
    }

    /// Walk the direct dependencies of an already-visited node.
    fn expand(&mut self, node: &'g GraphNode) -> Result<BTreeSet<String>, ResolveError> {
        let id = node.id.as_str();
        self.resolved.script_actions.insert(id, BTreeSet::new());
        for dep_id in &node.deps {
            let dep = self
                .graph
                .lookup(dep_id)
                .map_err(|err| unknown(err, Some(id)))?;
            let mut gained = BTreeSet::new();
            if dep.classify() == Classification::Script {
                gained.insert(dep.cmake_name().to_owned());
            }
            gained.extend(self.visit(dep)?);
            self.resolved.script_actions.entry(id).or_default().extend(gained);
        }
        Ok(self
            .resolved
            .script_actions
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}
