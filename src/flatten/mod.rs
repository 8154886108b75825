//! Subspec views and `flatten_deps` absorption.
//!
//! [`SubspecSpec::from_node`] turns a graph node into the attribute set a
//! podspec subspec needs. [`flatten`] additionally folds every subtree listed
//! in the node's `flatten_deps` into it, depth first, following per-field
//! merge rules:
//!
//! - list fields are unioned and sorted;
//! - `header_dir` and `header_mappings_dir` keep the first non-empty value;
//! - `pod_target_xcconfig` settings union their entries key by key;
//! - dependency versions keep the higher version key by key;
//! - resource bundles union their sources key by key.
//!
//! The label, output name, test flag and the `flatten_deps` list itself are
//! never taken from an absorbed subspec.

mod error;
mod tree;
pub mod version;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::graph::metadata::{ConditionalDep, XcconfigValue};
use crate::graph::{Graph, GraphError, GraphNode, label};
use crate::paths::{pod_relative, pod_relative_sorted};

pub use error::FlattenError;
pub use tree::{ConditionalSubspec, PodspecTree, SubspecTree, podspec_tree};

const PRIVATE_HEADER_SUFFIXES: [&str; 4] = [".h", ".hpp", ".inc", ".inl"];

/// Attributes of one subspec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubspecSpec {
    /// Label of the node the subspec was built from.
    pub id: String,
    /// Subspec name.
    pub output_name: String,
    /// Emit as a `test_spec` instead of a `subspec`.
    pub test_subspec: bool,
    /// `requires_arc`, either `["true"]`/`["false"]` or a file list.
    pub requires_arc: Vec<String>,
    /// Extra compiler flags.
    pub compiler_flags: Vec<String>,
    /// System frameworks.
    pub frameworks: Vec<String>,
    /// `header_mappings_dir`.
    pub header_mappings_dir: String,
    /// `header_dir`.
    pub header_dir: String,
    /// System libraries.
    pub libraries: Vec<String>,
    /// Prebuilt libraries, pod relative.
    pub vendored_libraries: Vec<String>,
    /// Prebuilt frameworks, pod relative.
    pub vendored_frameworks: Vec<String>,
    /// Public headers, pod relative.
    pub public_header_files: Vec<String>,
    /// Headers among the sources that are not public.
    pub private_header_files: Vec<String>,
    /// Sources, pod relative.
    pub source_files: Vec<String>,
    /// Excluded sources, pod relative.
    pub exclude_files: Vec<String>,
    /// Build settings keyed by setting name.
    pub pod_target_xcconfig: IndexMap<String, XcconfigValue>,
    /// Pod dependencies.
    pub dependencies: BTreeSet<String>,
    /// Pinned dependency versions.
    pub dependency_versions: BTreeMap<String, String>,
    /// Labels of nested subspecs.
    pub subspecs: Vec<String>,
    /// Subspecs emitted under a condition.
    pub condition_deps: Vec<ConditionalDep>,
    /// Resource bundle name to pod-relative sources.
    pub resource_bundles: BTreeMap<String, Vec<String>>,
    /// Labels absorbed through `flatten_deps`, sorted.
    pub flatten_deps: Vec<String>,
}

impl SubspecSpec {
    /// Build the unflattened view of `node`.
    ///
    /// Direct dependencies marked `is_subspec_target` become nested subspecs;
    /// the sources of every other direct dependency are folded in.
    ///
    /// # Errors
    ///
    /// Returns [`FlattenError::UnknownTarget`] when a dependency or resource
    /// bundle label is missing.
    pub fn from_node(graph: &Graph, node: &GraphNode) -> Result<Self, FlattenError> {
        let pod = &node.metadata.podspec;
        let mut collected = pod_relative_sorted(
            &node.sources.iter().chain(&pod.pattern_source_files).collect::<Vec<_>>(),
        );
        let exclude_files = pod_relative_sorted(
            &node.exclude_sources.iter().chain(&pod.pattern_exclude_files).collect::<Vec<_>>(),
        );

        let mut subspecs = BTreeSet::new();
        for dep_id in node.deps.iter().sorted() {
            let dep = lookup(graph, dep_id, Some(node.id.as_str()))?;
            if dep.metadata.podspec.is_subspec_target {
                subspecs.insert(dep_id.clone());
            } else {
                collected.extend(dep.sources.iter().map(String::as_str).map(pod_relative));
            }
        }
        let source_files: Vec<String> = collected.into_iter().sorted().dedup().collect();

        let mut resource_bundles = BTreeMap::new();
        for bundle_id in &pod.resource_bundles {
            let bundle = lookup(graph, bundle_id, Some(node.id.as_str()))?;
            let name = label::label_name(bundle_id).unwrap_or(bundle_id.as_str()).to_owned();
            resource_bundles.insert(name, pod_relative_sorted(&bundle.sources));
        }

        let mut dependencies = BTreeSet::new();
        let mut dependency_versions: BTreeMap<String, String> = BTreeMap::new();
        for decl in &pod.dependency {
            dependencies.insert(decl.name.clone());
            if let Some(pinned) = &decl.version {
                let kept = dependency_versions
                    .get(&decl.name)
                    .map_or(pinned.as_str(), |current| version::higher_version(current, pinned))
                    .to_owned();
                dependency_versions.insert(decl.name.clone(), kept);
            }
        }

        let public_header_files = pod_relative_sorted(&pod.public_header_files);
        let private_header_files = source_files
            .iter()
            .filter(|source| PRIVATE_HEADER_SUFFIXES.iter().any(|suffix| source.ends_with(suffix)))
            .filter(|source| !public_header_files.contains(*source))
            .cloned()
            .collect();

        Ok(Self {
            id: node.id.clone(),
            output_name: pod.output_name.clone(),
            test_subspec: pod.test_subspec,
            requires_arc: pod.requires_arc.clone(),
            compiler_flags: pod.compiler_flags.clone(),
            frameworks: pod.frameworks.clone(),
            header_mappings_dir: pod.header_mappings_dir.clone(),
            header_dir: pod.header_dir.clone(),
            libraries: pod.libraries.clone(),
            vendored_libraries: pod_relative_sorted(&pod.vendored_libraries),
            vendored_frameworks: pod_relative_sorted(&pod.vendored_frameworks),
            public_header_files,
            private_header_files,
            source_files,
            exclude_files,
            pod_target_xcconfig: pod.pod_target_xcconfig.clone(),
            dependencies,
            dependency_versions,
            subspecs: subspecs.into_iter().collect(),
            condition_deps: pod.condition_deps.clone(),
            resource_bundles,
            flatten_deps: Vec::new(),
        })
    }

    /// Fold `other` into `self` following the per-field merge rules.
    pub fn absorb(&mut self, other: &Self) {
        for (mine, theirs) in [
            (&mut self.requires_arc, &other.requires_arc),
            (&mut self.compiler_flags, &other.compiler_flags),
            (&mut self.frameworks, &other.frameworks),
            (&mut self.libraries, &other.libraries),
            (&mut self.vendored_libraries, &other.vendored_libraries),
            (&mut self.vendored_frameworks, &other.vendored_frameworks),
            (&mut self.public_header_files, &other.public_header_files),
            (&mut self.private_header_files, &other.private_header_files),
            (&mut self.source_files, &other.source_files),
            (&mut self.exclude_files, &other.exclude_files),
            (&mut self.subspecs, &other.subspecs),
        ] {
            union_sorted(mine, theirs);
        }
        for (mine, theirs) in [
            (&mut self.header_dir, &other.header_dir),
            (&mut self.header_mappings_dir, &other.header_mappings_dir),
        ] {
            if mine.is_empty() {
                mine.clone_from(theirs);
            }
        }
        for dep in &other.condition_deps {
            if !self.condition_deps.contains(dep) {
                self.condition_deps.push(dep.clone());
            }
        }
        self.dependencies.extend(other.dependencies.iter().cloned());
        for (name, pinned) in &other.dependency_versions {
            let kept = self
                .dependency_versions
                .get(name)
                .map_or(pinned.as_str(), |current| version::higher_version(current, pinned))
                .to_owned();
            self.dependency_versions.insert(name.clone(), kept);
        }
        for (key, value) in &other.pod_target_xcconfig {
            match self.pod_target_xcconfig.get_mut(key) {
                Some(existing) => *existing = merge_xcconfig(existing, value),
                None => {
                    self.pod_target_xcconfig.insert(key.clone(), value.clone());
                }
            }
        }
        for (name, sources) in &other.resource_bundles {
            union_sorted(self.resource_bundles.entry(name.clone()).or_default(), sources);
        }
    }
}

fn lookup<'g>(
    graph: &'g Graph,
    wanted: &str,
    dependent: Option<&str>,
) -> Result<&'g GraphNode, FlattenError> {
    graph.lookup(wanted).map_err(|err| {
        let id = match err {
            GraphError::UnknownTarget { id } => id,
            other => other.to_string(),
        };
        FlattenError::UnknownTarget {
            id,
            dependent: dependent.map(str::to_owned),
        }
    })
}

/// Union `theirs` into `mine`, collapsing duplicates and sorting.
fn union_sorted(mine: &mut Vec<String>, theirs: &[String]) {
    if theirs.is_empty() {
        return;
    }
    let merged: BTreeSet<String> = mine.drain(..).chain(theirs.iter().cloned()).collect();
    mine.extend(merged);
}

fn merge_xcconfig(existing: &XcconfigValue, other: &XcconfigValue) -> XcconfigValue {
    let entries: BTreeSet<&str> = existing.entries().into_iter().chain(other.entries()).collect();
    let merged: Vec<String> = entries.into_iter().map(str::to_owned).collect();
    match merged.as_slice() {
        [single] => XcconfigValue::Scalar(single.clone()),
        _ => XcconfigValue::List(merged),
    }
}

/// Build the subspec of `node_id` with every `flatten_deps` subtree folded in.
///
/// # Errors
///
/// Returns [`FlattenError::IllegalFlattenTarget`] when a `flatten_deps`
/// entry is not a subspec target, [`FlattenError::CyclicFlatten`] when a node
/// reaches itself through `flatten_deps`, and [`FlattenError::UnknownTarget`]
/// for missing labels.
pub fn flatten(graph: &Graph, node_id: &str) -> Result<SubspecSpec, FlattenError> {
    let node = lookup(graph, node_id, None)?;
    flatten_target(graph, node)
}

fn flatten_target(graph: &Graph, node: &GraphNode) -> Result<SubspecSpec, FlattenError> {
    let mut stack = Vec::new();
    Flattener { graph }.flatten_node(node, &mut stack)
}

struct Flattener<'g> {
    graph: &'g Graph,
}

impl<'g> Flattener<'g> {
    fn flatten_node(
        &self,
        node: &'g GraphNode,
        stack: &mut Vec<&'g str>,
    ) -> Result<SubspecSpec, FlattenError> {
        stack.push(node.id.as_str());
        let mut spec = SubspecSpec::from_node(self.graph, node)?;

        let targets: Vec<&'g GraphNode> = node
            .metadata
            .podspec
            .flatten_deps
            .iter()
            .sorted()
            .dedup()
            .map(|dep_id| {
                let dep = lookup(self.graph, dep_id, Some(node.id.as_str()))?;
                if stack.contains(&dep.id.as_str()) {
                    let mut chain: Vec<String> = stack.iter().map(|id| (*id).to_owned()).collect();
                    chain.push(dep.id.clone());
                    return Err(FlattenError::CyclicFlatten { chain });
                }
                if dep.metadata.podspec.is_subspec_target {
                    Ok(dep)
                } else {
                    Err(FlattenError::IllegalFlattenTarget {
                        id: dep_id.clone(),
                        dependent: node.id.clone(),
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        for dep in targets {
            let absorbed = self.flatten_node(dep, stack)?;
            debug!(label = %node.id, absorbed = %dep.id, "flattening subspec");
            spec.absorb(&absorbed);
            spec.flatten_deps.push(dep.id.clone());
        }
        stack.pop();
        Ok(spec)
    }
}
