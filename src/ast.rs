//! GN project description structures.
//!
//! This module defines the data structures used to represent the JSON
//! document written by `gn gen --ide=json`. Only the keys the generators read
//! are modelled; everything else in the document is ignored during
//! deserialisation.
//!
//! ```rust
//! use gnbridge::ast::ProjectDescription;
//!
//! let json = r#"{
//!     "build_settings": { "root_path": "/src", "build_dir": "//out/Default/" },
//!     "targets": { "//app:app": { "type": "executable", "sources": ["//app/main.cc"] } }
//! }"#;
//! let project: ProjectDescription = serde_json::from_str(json).expect("parse");
//! assert_eq!(project.targets.len(), 1);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Metadata values keyed by name. GN always emits metadata values as lists.
pub type RawMetadata = IndexMap<String, Vec<serde_json::Value>>;

/// Top-level project description.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectDescription {
    /// Global settings shared by every target.
    pub build_settings: BuildSettings,

    /// Target records keyed by their fully qualified label.
    #[serde(default)]
    pub targets: IndexMap<String, TargetDescription>,
}

/// Paths describing where the sources and the build output live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildSettings {
    /// Absolute path of the source root.
    pub root_path: String,
    /// Build directory in source-absolute form, e.g. `//out/Default/`.
    pub build_dir: String,
}

/// One raw target record.
///
/// Every field is optional in the JSON document and defaults to empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TargetDescription {
    /// GN output type such as `executable` or `source_set`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Source files in declaration order.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Labels of direct dependencies.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Preprocessor definitions.
    #[serde(default)]
    pub defines: Vec<String>,

    /// Header search directories.
    #[serde(default)]
    pub include_dirs: Vec<String>,

    /// Flags for every C-family language.
    #[serde(default)]
    pub cflags: Vec<String>,

    /// Flags for C sources only.
    #[serde(default)]
    pub cflags_c: Vec<String>,

    /// Flags for C++ sources only.
    #[serde(default)]
    pub cflags_cc: Vec<String>,

    /// Flags for assembler sources.
    #[serde(default)]
    pub asmflags: Vec<String>,

    /// Linker flags.
    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Library search directories.
    #[serde(default)]
    pub lib_dirs: Vec<String>,

    /// Libraries to link.
    #[serde(default)]
    pub libs: Vec<String>,

    /// Files produced by script targets.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Script run by `action` and `action_foreach` targets.
    #[serde(default)]
    pub script: Option<String>,

    /// Arguments passed to the script.
    #[serde(default)]
    pub args: Vec<String>,

    /// Lines written to the target's response file.
    #[serde(default)]
    pub response_file_contents: Vec<String>,

    /// Sources excluded from packaging.
    #[serde(default)]
    pub exclude_sources: Vec<String>,

    /// Name of the produced artefact.
    #[serde(default)]
    pub output_name: Option<String>,

    /// Free-form metadata consumed by the generators.
    #[serde(default)]
    pub metadata: RawMetadata,
}
