//! Graph store and target model.
//!
//! [`Graph`] owns every target of a project description, converted once into
//! a [`GraphNode`] with typed metadata. The store is read-only after loading;
//! resolution and flattening borrow nodes from it.
//!
//! # Examples
//!
//! ```
//! use gnbridge::graph::{Classification, Graph};
//!
//! let graph = Graph::from_json_str(r#"{
//!     "build_settings": { "root_path": "/src", "build_dir": "//out/Default/" },
//!     "targets": {
//!         "//app:app": { "type": "executable", "sources": ["//app/main.cc"] }
//!     }
//! }"#).expect("load");
//! let app = graph.lookup("//app:app").expect("app");
//! assert_eq!(app.classify(), Classification::Barrier);
//! assert_eq!(graph.build_path(), "/src/out/Default/");
//! ```

mod error;
pub mod kind;
pub mod label;
pub mod metadata;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use camino::Utf8Path;
use indexmap::IndexMap;
use serde::Serialize;

use crate::ast::{ProjectDescription, TargetDescription};

pub use error::GraphError;
pub use kind::{KindTraits, TargetKind};
pub use metadata::NodeMetadata;

/// How the resolver treats a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A complete artefact linked as-is; its dependencies are not expanded.
    Barrier,
    /// A node compiled into the requesting root.
    SourceUnit,
    /// A build-time command tracked as an ordering dependency.
    Script,
    /// A node whose kind the generators do not understand.
    Unsupported,
}

/// One target of the project.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Fully qualified label.
    pub id: String,
    /// Parsed kind, `None` when the raw kind is unsupported or missing.
    pub kind: Option<TargetKind>,
    /// Kind as spelled in the project description.
    pub raw_kind: Option<String>,
    /// Source files in declaration order.
    pub sources: Vec<String>,
    /// Labels of direct dependencies in declaration order.
    pub deps: Vec<String>,
    /// Preprocessor definitions.
    pub defines: Vec<String>,
    /// Header search directories.
    pub include_dirs: Vec<String>,
    /// Flags for every C-family language.
    pub cflags: Vec<String>,
    /// Flags for C sources.
    pub cflags_c: Vec<String>,
    /// Flags for C++ sources.
    pub cflags_cc: Vec<String>,
    /// Flags for assembler sources.
    pub asmflags: Vec<String>,
    /// Linker flags.
    pub ldflags: Vec<String>,
    /// Library search directories.
    pub lib_dirs: Vec<String>,
    /// Libraries to link.
    pub libs: Vec<String>,
    /// Files produced by script targets.
    pub outputs: Vec<String>,
    /// Script run by action targets.
    pub script: Option<String>,
    /// Script arguments.
    pub args: Vec<String>,
    /// Response file lines.
    pub response_file_contents: Vec<String>,
    /// Sources excluded from packaging.
    pub exclude_sources: Vec<String>,
    /// Artefact name, defaulting to the label's name.
    pub output_name: String,
    /// Typed metadata.
    pub metadata: NodeMetadata,
    cmake_name: OnceLock<String>,
}

impl GraphNode {
    /// Build a node from its raw record.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MalformedMetadata`] when the metadata block cannot
    /// be parsed.
    pub fn from_description(id: String, raw: TargetDescription) -> Result<Self, GraphError> {
        let metadata = NodeMetadata::parse(&id, &raw.metadata)?;
        let kind = raw.kind.as_deref().and_then(TargetKind::parse);
        let output_name = raw
            .output_name
            .filter(|name| !name.is_empty())
            .or_else(|| label::label_name(&id).map(str::to_owned))
            .unwrap_or_default();
        Ok(Self {
            kind,
            raw_kind: raw.kind,
            sources: raw.sources,
            deps: raw.deps,
            defines: raw.defines,
            include_dirs: raw.include_dirs,
            cflags: raw.cflags,
            cflags_c: raw.cflags_c,
            cflags_cc: raw.cflags_cc,
            asmflags: raw.asmflags,
            ldflags: raw.ldflags,
            lib_dirs: raw.lib_dirs,
            libs: raw.libs,
            outputs: raw.outputs,
            script: raw.script,
            args: raw.args,
            response_file_contents: raw.response_file_contents,
            exclude_sources: raw.exclude_sources,
            output_name,
            metadata,
            cmake_name: OnceLock::new(),
            id,
        })
    }

    /// CMake target name, derived from the label on first access.
    #[must_use]
    pub fn cmake_name(&self) -> &str {
        self.cmake_name
            .get_or_init(|| label::cmake_identifier(&self.id))
    }

    /// Directory part of the label.
    #[must_use]
    pub fn label_dir(&self) -> &str {
        label::label_dir(&self.id)
    }

    /// Behaviour record of the node's kind.
    #[must_use]
    pub fn traits(&self) -> Option<KindTraits> {
        self.kind.map(TargetKind::traits)
    }

    /// Classify the node for dependency resolution.
    #[must_use]
    pub fn classify(&self) -> Classification {
        match self.kind {
            None => Classification::Unsupported,
            Some(kind) if kind.is_script() => Classification::Script,
            Some(kind) if self.metadata.cmake.is_cmake_target || kind.traits().barrier => {
                Classification::Barrier
            }
            Some(_) => Classification::SourceUnit,
        }
    }

    /// Whether the node contributes compiled output.
    ///
    /// Source-checked kinds are useless without a non-header source; every
    /// other kind is always useful.
    #[must_use]
    pub fn is_useful(&self) -> bool {
        match self.kind {
            Some(kind) if kind.checks_sources() => {
                self.sources.iter().any(|source| !kind::is_header(source))
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// Read-only store of every target in a project.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: IndexMap<String, GraphNode>,
    root_path: String,
    build_path: String,
}

impl Graph {
    /// Convert a parsed project description into a graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MalformedMetadata`] when any target carries
    /// malformed metadata.
    pub fn from_description(description: ProjectDescription) -> Result<Self, GraphError> {
        let settings = description.build_settings;
        let build_dir = settings.build_dir.trim_start_matches('/');
        let build_path = Utf8Path::new(&settings.root_path).join(build_dir).into_string();
        let nodes = description
            .targets
            .into_iter()
            .map(|(id, raw)| {
                let node = GraphNode::from_description(id.clone(), raw)?;
                Ok((id, node))
            })
            .collect::<Result<IndexMap<_, _>, GraphError>>()?;
        tracing::debug!(targets = nodes.len(), %build_path, "loaded project graph");
        Ok(Self {
            nodes,
            root_path: settings.root_path,
            build_path,
        })
    }

    /// Parse a project description from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Parse`] for invalid JSON and
    /// [`GraphError::MalformedMetadata`] for malformed metadata.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let description: ProjectDescription =
            serde_json::from_str(json).map_err(|source| GraphError::Parse { source })?;
        Self::from_description(description)
    }

    /// Find a node by label.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownTarget`] when `id` is absent.
    pub fn lookup(&self, id: &str) -> Result<&GraphNode, GraphError> {
        self.nodes.get(id).ok_or_else(|| GraphError::UnknownTarget { id: id.to_owned() })
    }

    /// Whether the store holds `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Every node in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Absolute source root.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Absolute build directory.
    #[must_use]
    pub fn build_path(&self) -> &str {
        &self.build_path
    }

    /// Groups of labels that derive the same CMake identifier.
    ///
    /// Distinct labels sharing an identifier would produce clashing CMake
    /// targets; callers report these rather than renaming silently.
    #[must_use]
    pub fn identifier_collisions(&self) -> Vec<(String, Vec<String>)> {
        let mut by_name: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for node in self.nodes() {
            by_name.entry(node.cmake_name()).or_default().push(node.id.clone());
        }
        by_name
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, ids)| (name.to_owned(), ids))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn graph(targets: serde_json::Value) -> Graph {
        let doc = json!({
            "build_settings": { "root_path": "/src", "build_dir": "//out/Default/" },
            "targets": targets,
        });
        Graph::from_json_str(&doc.to_string()).expect("graph")
    }

    #[rstest]
    fn lookup_reports_unknown_targets() {
        let graph = graph(json!({}));
        let err = graph.lookup("//missing:target").expect_err("unknown");
        assert!(matches!(err, GraphError::UnknownTarget { id } if id == "//missing:target"));
    }

    #[rstest]
    fn classifies_nodes() {
        let graph = graph(json!({
            "//a:exe": { "type": "executable" },
            "//a:lib": { "type": "static_library", "metadata": { "is_cmake_target": [true] } },
            "//a:set": { "type": "source_set" },
            "//a:gen": { "type": "action" },
            "//a:rs": { "type": "rust_library" },
            "//a:none": {},
        }));
        let class = |id: &str| graph.lookup(id).expect("node").classify();
        assert_eq!(class("//a:exe"), Classification::Barrier);
        assert_eq!(class("//a:lib"), Classification::Barrier);
        assert_eq!(class("//a:set"), Classification::SourceUnit);
        assert_eq!(class("//a:gen"), Classification::Script);
        assert_eq!(class("//a:rs"), Classification::Unsupported);
        assert_eq!(class("//a:none"), Classification::Unsupported);
    }

    #[rstest]
    #[case(json!(["a.h"]), false)]
    #[case(json!(["a.h", "a.cc"]), true)]
    #[case(json!(["a.hpp"]), false)]
    #[case(json!([]), false)]
    fn static_library_usefulness(#[case] sources: serde_json::Value, #[case] useful: bool) {
        let graph = graph(json!({ "//a:lib": { "type": "static_library", "sources": sources } }));
        assert_eq!(graph.lookup("//a:lib").expect("node").is_useful(), useful);
    }

    #[rstest]
    fn script_and_bundle_kinds_are_always_useful() {
        let graph = graph(json!({
            "//a:gen": { "type": "action" },
            "//a:res": { "type": "bundle_data" },
        }));
        assert!(graph.lookup("//a:gen").expect("gen").is_useful());
        assert!(graph.lookup("//a:res").expect("res").is_useful());
    }

    #[rstest]
    fn output_name_defaults_to_label_name() {
        let graph = graph(json!({
            "//a:named": { "type": "executable", "output_name": "tool" },
            "//a:plain": { "type": "executable" },
        }));
        assert_eq!(graph.lookup("//a:named").expect("named").output_name, "tool");
        assert_eq!(graph.lookup("//a:plain").expect("plain").output_name, "plain");
    }

    #[rstest]
    fn reports_identifier_collisions() {
        let graph = graph(json!({
            "//foo/x:y": { "type": "source_set" },
            "//fab/x:y": { "type": "source_set" },
            "//bar:z": { "type": "source_set" },
        }));
        let collisions = graph.identifier_collisions();
        assert_eq!(
            collisions,
            vec![("f__x_y".to_owned(), vec!["//foo/x:y".to_owned(), "//fab/x:y".to_owned()])]
        );
    }

    #[rstest]
    fn malformed_metadata_fails_loading() {
        let doc = json!({
            "build_settings": { "root_path": "/src", "build_dir": "//out/" },
            "targets": { "//a:a": { "type": "group", "metadata": { "is_cmake_target": [1] } } },
        });
        let err = Graph::from_json_str(&doc.to_string()).expect_err("malformed");
        assert!(matches!(err, GraphError::MalformedMetadata { .. }));
    }
}
