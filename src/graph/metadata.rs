//! Typed view of the free-form `metadata` block.
//!
//! GN emits metadata as `key -> [values...]`. The generators read a fixed set
//! of keys; this module parses them once, applying defaults centrally and
//! rejecting values of the wrong shape with
//! [`GraphError::MalformedMetadata`].

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::GraphError;
use crate::ast::RawMetadata;

/// Marker in the third slot of a `find_and_link_packages` entry requesting a
/// `CONFIG` mode package lookup.
pub const CONFIG_SENTINEL: &str = "cmake::configd";

/// Platforms whose nested `root_specification` blocks are expanded to dotted
/// keys.
const POD_PLATFORMS: [&str; 4] = ["ios", "osx", "macos", "tvos"];

/// An external package required by a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    /// Package name passed to `find_package`.
    pub name: String,
    /// Directories searched for the package.
    pub search_paths: Vec<String>,
    /// Whether the package must be found in `CONFIG` mode.
    pub requires_config: bool,
    /// Modules of the package linked by the target.
    pub modules: Vec<String>,
}

/// A subspec emitted only when a podspec global variable is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConditionalDep {
    /// Label of the conditional subspec.
    pub target: String,
    /// Name of the global variable gating the subspec.
    pub condition: String,
}

/// A pod dependency, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDecl {
    /// Pod name.
    pub name: String,
    /// Requested version, if any.
    pub version: Option<String>,
}

/// A `pod_target_xcconfig` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XcconfigValue {
    /// A single setting.
    Scalar(String),
    /// A list of settings, rendered space separated.
    List(Vec<String>),
}

impl XcconfigValue {
    /// Borrow the setting as a list of entries.
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        match self {
            Self::Scalar(value) => vec![value.as_str()],
            Self::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Metadata read by the CMake generator and the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CmakeMetadata {
    /// Directory receiving the generated files.
    pub output_path: Option<String>,
    /// The target is an independently materialised build unit.
    pub is_cmake_target: bool,
    /// The target is only emitted as a nested root.
    pub is_only_sub_cmake: bool,
    /// Minimum CMake version written to the header.
    pub cmake_version: String,
    /// Nested roots emitted below this target.
    pub sub_cmake_target: Vec<String>,
    /// Nested roots emitted below this target and linked into it.
    pub sub_cmake_target_and_link: Vec<String>,
    /// External packages the target requires.
    pub find_and_link_packages: Vec<PackageSpec>,
    /// Name for the CMake `project()` call.
    pub project_name: String,
    /// File name of the generated CMake fragment.
    pub file_name: String,
}

/// Metadata read by the podspec generator and the flattener.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodspecMetadata {
    /// Subspecs gated by a global variable.
    pub condition_deps: Vec<ConditionalDep>,
    /// Ruby statements written before the spec.
    pub global_variables: Vec<String>,
    /// Spec or subspec name.
    pub output_name: String,
    /// Directory receiving the podspec file.
    pub output_path: String,
    /// Root-level attributes of the spec.
    pub root_specification: IndexMap<String, Value>,
    /// The subspec is a test spec.
    pub test_subspec: bool,
    /// `header_mappings_dir` attribute.
    pub header_mappings_dir: String,
    /// `header_dir` attribute.
    pub header_dir: String,
    /// `requires_arc` attribute, either a single boolean or a file list.
    pub requires_arc: Vec<String>,
    /// Prebuilt frameworks shipped with the pod.
    pub vendored_frameworks: Vec<String>,
    /// Prebuilt libraries shipped with the pod.
    pub vendored_libraries: Vec<String>,
    /// Extra compiler flags.
    pub compiler_flags: Vec<String>,
    /// Headers exported by the pod.
    pub public_header_files: Vec<String>,
    /// System frameworks linked.
    pub frameworks: Vec<String>,
    /// System libraries linked.
    pub libraries: Vec<String>,
    /// Labels of `bundle_data` targets packaged as resource bundles.
    pub resource_bundles: Vec<String>,
    /// Pod dependencies.
    pub dependency: Vec<DependencyDecl>,
    /// Source globs added to the subspec.
    pub pattern_source_files: Vec<String>,
    /// Exclusion globs added to the subspec.
    pub pattern_exclude_files: Vec<String>,
    /// Build settings applied to the pod target.
    pub pod_target_xcconfig: IndexMap<String, XcconfigValue>,
    /// The target may be nested or flattened as a subspec.
    pub is_subspec_target: bool,
    /// Subspecs folded into this one instead of being nested.
    pub flatten_deps: Vec<String>,
}

/// All typed metadata of a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeMetadata {
    /// Keys used by the CMake side.
    pub cmake: CmakeMetadata,
    /// Keys used by the podspec side.
    pub podspec: PodspecMetadata,
}

impl NodeMetadata {
    /// Parse the raw metadata of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MalformedMetadata`] when a recognised key holds a
    /// value of the wrong shape.
    pub fn parse(target: &str, raw: &RawMetadata) -> Result<Self, GraphError> {
        let reader = Reader { target, raw };
        let cmake = CmakeMetadata {
            output_path: reader.optional_string("output_path")?,
            is_cmake_target: reader.flag("is_cmake_target")?,
            is_only_sub_cmake: reader.flag("is_only_sub_cmake")?,
            cmake_version: reader.string("cmake_version")?,
            sub_cmake_target: reader.strings("sub_cmake_target")?,
            sub_cmake_target_and_link: reader.strings("sub_cmake_target_and_link")?,
            find_and_link_packages: reader.packages("find_and_link_packages")?,
            project_name: reader.string("project_name")?,
            file_name: reader.string("file_name")?,
        };
        let podspec = PodspecMetadata {
            condition_deps: reader.condition_deps("condition_deps")?,
            global_variables: reader.strings("global_variables")?,
            output_name: reader.string("output_name")?,
            output_path: reader.string("output_path")?,
            root_specification: expand_platforms(reader.object("root_specification")?),
            test_subspec: reader.flag("test_subspec")?,
            header_mappings_dir: reader.string("header_mappings_dir")?,
            header_dir: reader.string("header_dir")?,
            requires_arc: reader.scalars("requires_arc")?,
            vendored_frameworks: reader.strings("vendored_frameworks")?,
            vendored_libraries: reader.strings("vendored_libraries")?,
            compiler_flags: reader.strings("compiler_flags")?,
            public_header_files: reader.strings("public_header_files")?,
            frameworks: reader.strings("frameworks")?,
            libraries: reader.strings("libraries")?,
            resource_bundles: reader.strings("resource_bundles")?,
            dependency: reader.dependencies("dependency")?,
            pattern_source_files: reader.strings("pattern_source_files")?,
            pattern_exclude_files: reader.strings("pattern_exclude_files")?,
            pod_target_xcconfig: reader.xcconfig("pod_target_xcconfig")?,
            is_subspec_target: reader.flag("is_subspec_target")?,
            flatten_deps: reader.strings("flatten_deps")?,
        };
        Ok(Self { cmake, podspec })
    }
}

/// Expand `ios: { deployment_target: .. }` into `ios.deployment_target`.
fn expand_platforms(mut spec: IndexMap<String, Value>) -> IndexMap<String, Value> {
    for platform in POD_PLATFORMS {
        let Some(Value::Object(_)) = spec.get(platform) else {
            continue;
        };
        if let Some(Value::Object(args)) = spec.shift_remove(platform) {
            for (key, value) in args {
                spec.insert(format!("{platform}.{key}"), value);
            }
        }
    }
    spec
}

struct Reader<'a> {
    target: &'a str,
    raw: &'a RawMetadata,
}

impl Reader<'_> {
    fn malformed(&self, key: &str, reason: impl Into<String>) -> GraphError {
        GraphError::MalformedMetadata {
            target: self.target.to_owned(),
            key: key.to_owned(),
            reason: reason.into(),
        }
    }

    fn values(&self, key: &str) -> &[Value] {
        self.raw.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    fn first(&self, key: &str) -> Option<&Value> {
        self.values(key).first()
    }

    fn flag(&self, key: &str) -> Result<bool, GraphError> {
        match self.first(key) {
            None => Ok(false),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(other) => Err(self.malformed(key, format!("expected a boolean, found {other}"))),
        }
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>, GraphError> {
        match self.first(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(other) => Err(self.malformed(key, format!("expected a string, found {other}"))),
        }
    }

    fn string(&self, key: &str) -> Result<String, GraphError> {
        Ok(self.optional_string(key)?.unwrap_or_default())
    }

    fn strings(&self, key: &str) -> Result<Vec<String>, GraphError> {
        self.values(key)
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| self.malformed(key, format!("expected a string, found {value}")))
            })
            .collect()
    }

    /// Strings, with booleans accepted as `"true"` / `"false"`.
    fn scalars(&self, key: &str) -> Result<Vec<String>, GraphError> {
        self.values(key)
            .iter()
            .map(|value| match value {
                Value::String(text) => Ok(text.clone()),
                Value::Bool(flag) => Ok(flag.to_string()),
                other => Err(self.malformed(key, format!("expected a string, found {other}"))),
            })
            .collect()
    }

    fn object(&self, key: &str) -> Result<IndexMap<String, Value>, GraphError> {
        match self.first(key) {
            None => Ok(IndexMap::new()),
            Some(Value::Object(map)) => Ok(map.clone().into_iter().collect()),
            Some(other) => Err(self.malformed(key, format!("expected an object, found {other}"))),
        }
    }

    fn xcconfig(&self, key: &str) -> Result<IndexMap<String, XcconfigValue>, GraphError> {
        self.object(key)?
            .into_iter()
            .map(|(name, value)| {
                let parsed = match value {
                    Value::String(text) => XcconfigValue::Scalar(text),
                    Value::Array(items) => XcconfigValue::List(
                        items
                            .iter()
                            .map(|item| {
                                item.as_str().map(str::to_owned).ok_or_else(|| {
                                    self.malformed(key, format!("setting `{name}` holds {item}"))
                                })
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    other => {
                        return Err(
                            self.malformed(key, format!("setting `{name}` holds {other}"))
                        );
                    }
                };
                Ok((name, parsed))
            })
            .collect()
    }

    fn entry<'v>(&self, key: &str, value: &'v Value) -> Result<&'v [Value], GraphError> {
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.malformed(key, format!("expected a list entry, found {value}")))
    }

    fn entry_string(&self, key: &str, value: Option<&Value>, what: &str) -> Result<String, GraphError> {
        match value {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => Err(self.malformed(key, format!("{what} must be a string, found {other}"))),
            None => Err(self.malformed(key, format!("entry is missing the {what}"))),
        }
    }

    fn packages(&self, key: &str) -> Result<Vec<PackageSpec>, GraphError> {
        self.values(key)
            .iter()
            .map(|value| {
                let entry = self.entry(key, value)?;
                let mut items = entry.iter();
                let name = self.entry_string(key, items.next(), "package name")?;
                let search_paths = match items.next() {
                    None => Vec::new(),
                    Some(Value::String(path)) => vec![path.clone()],
                    Some(Value::Array(paths)) => paths
                        .iter()
                        .map(|path| self.entry_string(key, Some(path), "search path"))
                        .collect::<Result<_, _>>()?,
                    Some(other) => {
                        return Err(self.malformed(
                            key,
                            format!("search paths of `{name}` must be a list, found {other}"),
                        ));
                    }
                };
                let rest = items
                    .map(|item| self.entry_string(key, Some(item), "module"))
                    .collect::<Result<Vec<_>, _>>()?;
                let requires_config = rest.first().is_some_and(|slot| slot == CONFIG_SENTINEL);
                let modules = if requires_config {
                    rest.into_iter().skip(1).collect()
                } else {
                    rest
                };
                Ok(PackageSpec {
                    name,
                    search_paths,
                    requires_config,
                    modules,
                })
            })
            .collect()
    }

    fn condition_deps(&self, key: &str) -> Result<Vec<ConditionalDep>, GraphError> {
        self.values(key)
            .iter()
            .map(|value| {
                let entry = self.entry(key, value)?;
                let target = self.entry_string(key, entry.first(), "target label")?;
                let condition = self.entry_string(key, entry.get(1), "condition")?;
                Ok(ConditionalDep { target, condition })
            })
            .collect()
    }

    fn dependencies(&self, key: &str) -> Result<Vec<DependencyDecl>, GraphError> {
        self.values(key)
            .iter()
            .map(|value| match value {
                Value::String(name) => Ok(DependencyDecl {
                    name: name.clone(),
                    version: None,
                }),
                Value::Array(entry) => {
                    let name = self.entry_string(key, entry.first(), "pod name")?;
                    let version = entry
                        .get(1)
                        .map(|version| self.entry_string(key, Some(version), "pod version"))
                        .transpose()?;
                    Ok(DependencyDecl { name, version })
                }
                other => Err(self.malformed(key, format!("expected a pod name, found {other}"))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn raw(value: Value) -> RawMetadata {
        serde_json::from_value(value).expect("metadata")
    }

    #[rstest]
    fn absent_keys_take_defaults() {
        let meta = NodeMetadata::parse("//a:a", &RawMetadata::new()).expect("parse");
        assert_eq!(meta, NodeMetadata::default());
    }

    #[rstest]
    fn reads_cmake_flags_and_scalars() {
        let meta = NodeMetadata::parse(
            "//a:a",
            &raw(json!({
                "is_cmake_target": [true],
                "cmake_version": ["3.18"],
                "file_name": ["CMakeLists.txt"],
                "sub_cmake_target": ["//b:b", "//c:c"],
            })),
        )
        .expect("parse");
        assert!(meta.cmake.is_cmake_target);
        assert!(!meta.cmake.is_only_sub_cmake);
        assert_eq!(meta.cmake.cmake_version, "3.18");
        assert_eq!(meta.cmake.file_name, "CMakeLists.txt");
        assert_eq!(meta.cmake.sub_cmake_target, ["//b:b", "//c:c"]);
    }

    #[rstest]
    fn parses_package_entries() {
        let meta = NodeMetadata::parse(
            "//a:a",
            &raw(json!({
                "find_and_link_packages": [
                    ["Foo", ["//third_party/foo"], "cmake::configd", "Foo::core", "Foo::io"],
                    ["Bar", [], "bar"],
                ],
            })),
        )
        .expect("parse");
        let packages = &meta.cmake.find_and_link_packages;
        assert_eq!(packages.len(), 2);
        let foo = packages.first().expect("foo");
        assert!(foo.requires_config);
        assert_eq!(foo.search_paths, ["//third_party/foo"]);
        assert_eq!(foo.modules, ["Foo::core", "Foo::io"]);
        let bar = packages.get(1).expect("bar");
        assert!(!bar.requires_config);
        assert_eq!(bar.modules, ["bar"]);
    }

    #[rstest]
    #[case(json!({ "is_cmake_target": ["yes"] }), "is_cmake_target")]
    #[case(json!({ "sub_cmake_target": [1] }), "sub_cmake_target")]
    #[case(json!({ "find_and_link_packages": ["Foo"] }), "find_and_link_packages")]
    #[case(json!({ "condition_deps": [["//a:b"]] }), "condition_deps")]
    #[case(json!({ "root_specification": ["name"] }), "root_specification")]
    fn rejects_malformed_shapes(#[case] value: Value, #[case] expected_key: &str) {
        let err = NodeMetadata::parse("//a:a", &raw(value)).expect_err("malformed");
        match err {
            GraphError::MalformedMetadata { target, key, .. } => {
                assert_eq!(target, "//a:a");
                assert_eq!(key, expected_key);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn expands_platform_blocks() {
        let meta = NodeMetadata::parse(
            "//a:a",
            &raw(json!({
                "root_specification": [{
                    "name": "Lib",
                    "ios": { "deployment_target": "10.0" },
                }],
            })),
        )
        .expect("parse");
        let spec = &meta.podspec.root_specification;
        assert_eq!(spec.get("name"), Some(&json!("Lib")));
        assert_eq!(spec.get("ios.deployment_target"), Some(&json!("10.0")));
        assert!(!spec.contains_key("ios"));
    }

    #[rstest]
    fn parses_pod_dependencies_and_requires_arc() {
        let meta = NodeMetadata::parse(
            "//a:a",
            &raw(json!({
                "dependency": ["Base", ["Bar", "1.2.0"]],
                "requires_arc": [true],
                "pod_target_xcconfig": [{ "GCC_PREPROCESSOR_DEFINITIONS": ["A=1"], "OTHER": "x" }],
            })),
        )
        .expect("parse");
        let pod = &meta.podspec;
        assert_eq!(
            pod.dependency,
            [
                DependencyDecl { name: "Base".into(), version: None },
                DependencyDecl { name: "Bar".into(), version: Some("1.2.0".into()) },
            ]
        );
        assert_eq!(pod.requires_arc, ["true"]);
        assert_eq!(
            pod.pod_target_xcconfig.get("OTHER"),
            Some(&XcconfigValue::Scalar("x".into()))
        );
    }
}
