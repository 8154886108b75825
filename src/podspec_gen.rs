//! Podspec generator.
//!
//! Renders a [`PodspecTree`] as a CocoaPods `.podspec` file. Attribute keys
//! are padded to a fixed column so the generated Ruby lines up, and every
//! list is emitted in sorted order.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use camino::Utf8Path;
use serde_json::Value;

use crate::flatten::{ConditionalSubspec, PodspecTree, SubspecSpec, SubspecTree};
use crate::generated::{GeneratedFile, RenderError};
use crate::graph::metadata::XcconfigValue;

/// Column attribute values start at, excluding indentation.
const HEAD_WIDTH: usize = 30;

const HEADER: &str = "# Generated by gnbridge. Do not edit.\n# coding: utf-8\n";

/// Keys whose dictionary entries use Ruby symbols instead of strings.
const SYMBOL_KEYED: [&str; 3] = ["source", "license", "scheme"];

const HEADER_SEARCH_PATHS: &str = "HEADER_SEARCH_PATHS";

/// Xcode build variables a `//NAME` include prefix may refer to.
const XCODE_VARIABLES: [&str; 4] = [
    "PODS_ROOT",
    "PODS_CONFIGURATION_BUILD_DIR",
    "TARGET_BUILD_DIR",
    "PODS_TARGET_SRCROOT",
];

/// Render the podspec for `tree`.
///
/// The file is named after the root's `output_name` and placed in its
/// `output_path`.
///
/// # Errors
///
/// Returns [`RenderError::MissingOutputName`] when the root has no
/// `output_name` metadata.
pub fn generate(tree: &PodspecTree<'_>) -> Result<GeneratedFile, RenderError> {
    let pod = &tree.root.metadata.podspec;
    if pod.output_name.is_empty() {
        return Err(RenderError::MissingOutputName {
            id: tree.root.id.clone(),
        });
    }
    let path = Utf8Path::new(&pod.output_path).join(&pod.output_name);
    Ok(GeneratedFile::new(path, Podspec { tree }.to_string()))
}

/// Block variable of a spec nested `level` deep.
fn block_var(level: usize, test_spec: bool) -> String {
    if test_spec {
        return "test_spec".to_owned();
    }
    format!("{}p", "s".repeat(level))
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

/// Convert a GN include path into a quoted Xcode search path.
fn search_path(include: &str) -> String {
    let expanded = include
        .strip_prefix("//")
        .and_then(|rest| {
            XCODE_VARIABLES.iter().find_map(|var| {
                rest.strip_prefix(var).map(|tail| format!("${{{var}}}{tail}"))
            })
        })
        .unwrap_or_else(|| include.replace("//", "${PODS_TARGET_SRCROOT}/"));
    format!("\\\"{expanded}\\\"")
}

fn search_paths<S: AsRef<str>>(includes: &[S]) -> Vec<String> {
    let mut paths: Vec<String> = includes.iter().map(|path| search_path(path.as_ref())).collect();
    paths.sort();
    paths
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// One value inside a rendered Ruby hash.
enum HashValue {
    Text(String),
    List(Vec<String>),
}

impl HashValue {
    fn from_json(key: &str, value: &Value) -> Self {
        let items = match value {
            Value::Array(items) => items.iter().map(json_text).collect(),
            Value::String(text) if key == HEADER_SEARCH_PATHS => vec![text.clone()],
            other => return Self::Text(json_text(other)),
        };
        Self::list(key, items)
    }

    fn from_xcconfig(key: &str, value: &XcconfigValue) -> Self {
        match value {
            XcconfigValue::Scalar(text) if key != HEADER_SEARCH_PATHS => Self::Text(text.clone()),
            other => Self::list(key, other.entries().into_iter().map(str::to_owned).collect()),
        }
    }

    fn list(key: &str, items: Vec<String>) -> Self {
        if key == HEADER_SEARCH_PATHS {
            Self::List(search_paths(&items))
        } else {
            Self::List(items)
        }
    }
}

/// Write `{indent}{var}.{key}` padded to the value column, returning the
/// padded width.
fn write_head(f: &mut Formatter<'_>, var: &str, key: &str, level: usize) -> Result<usize, fmt::Error> {
    let head = format!("{}{var}.{key}", indent(level));
    let width = HEAD_WIDTH + level * 2;
    write!(f, "{head:<width$}")?;
    Ok(head.len().max(width))
}

fn write_string(f: &mut Formatter<'_>, var: &str, key: &str, value: &str, level: usize) -> fmt::Result {
    write_head(f, var, key, level)?;
    writeln!(f, "= \"{value}\"")
}

fn write_raw(f: &mut Formatter<'_>, var: &str, key: &str, value: &str, level: usize) -> fmt::Result {
    write_head(f, var, key, level)?;
    writeln!(f, "= {value}")
}

/// Write a comma separated list, one value per line when `per_line` is set.
fn write_list<S: AsRef<str>>(
    f: &mut Formatter<'_>,
    var: &str,
    key: &str,
    values: &[S],
    level: usize,
    per_line: bool,
) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    let column = write_head(f, var, key, level)? + "= ".len();
    f.write_str("= ")?;
    let separator = if per_line {
        format!(",\n{}", " ".repeat(column))
    } else {
        ", ".to_owned()
    };
    let quoted: Vec<String> = values.iter().map(|value| format!("\"{}\"", value.as_ref())).collect();
    writeln!(f, "{}", quoted.join(&separator))
}

fn write_hash(
    f: &mut Formatter<'_>,
    var: &str,
    key: &str,
    entries: &BTreeMap<&str, HashValue>,
    level: usize,
) -> fmt::Result {
    write_head(f, var, key, level)?;
    f.write_str("= {\n")?;
    let symbol_keys = SYMBOL_KEYED.contains(&key);
    let space = indent(level + 1);
    let mut remaining = entries.len();
    for (name, value) in entries {
        let lead = if symbol_keys {
            format!("{space}:{name} => ")
        } else {
            format!("{space}\"{name}\" => ")
        };
        f.write_str(&lead)?;
        match value {
            HashValue::Text(text) => write!(f, "\"{text}\"")?,
            HashValue::List(items) => {
                let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                let continuation = format!(" \\\n{}", " ".repeat(lead.len()));
                write!(f, "\"{}\"", sorted.join(&continuation))?;
            }
        }
        remaining -= 1;
        if remaining > 0 {
            f.write_str(",")?;
        }
        f.write_str("\n")?;
    }
    writeln!(f, "{}}}", indent(level))
}

fn write_heredoc(f: &mut Formatter<'_>, var: &str, key: &str, value: &Value, level: usize) -> fmt::Result {
    write_head(f, var, key, level)?;
    f.write_str("= <<-CMD\n")?;
    let lines: Vec<String> = match value {
        Value::Array(items) => items.iter().map(json_text).collect(),
        other => vec![json_text(other)],
    };
    let space = indent(level + 1);
    for line in lines {
        writeln!(f, "{space}{line}")?;
    }
    writeln!(f, "{}CMD", indent(level))
}

struct Podspec<'a> {
    tree: &'a PodspecTree<'a>,
}

impl Display for Podspec<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let pod = &self.tree.root.metadata.podspec;
        f.write_str(HEADER)?;
        f.write_str("\n")?;
        if !pod.global_variables.is_empty() {
            for variable in &pod.global_variables {
                writeln!(f, "{variable}")?;
            }
            f.write_str("\n")?;
        }
        writeln!(f, "Pod::Spec.new do |{}|", block_var(0, false))?;
        self.write_root_specification(f)?;
        for subspec in &self.tree.subspecs {
            write_subspec(f, subspec, 1)?;
        }
        write_conditional(f, &self.tree.conditional, 1)?;
        f.write_str("end\n")
    }
}

impl Podspec<'_> {
    fn write_root_specification(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let var = block_var(0, false);
        let spec = &self.tree.root.metadata.podspec.root_specification;
        let mut keys: Vec<&String> = spec.keys().collect();
        keys.sort();
        for key in keys {
            let Some(value) = spec.get(key) else {
                continue;
            };
            if key == "prepare_command" {
                write_heredoc(f, &var, key, value, 1)?;
                continue;
            }
            match value {
                Value::Object(map) => {
                    let entries = map
                        .iter()
                        .map(|(name, entry)| (name.as_str(), HashValue::from_json(name, entry)))
                        .collect();
                    write_hash(f, &var, key, &entries, 1)?;
                }
                Value::Array(items) => {
                    let values: Vec<String> = items.iter().map(json_text).collect();
                    write_list(f, &var, key, &values, 1, false)?;
                }
                Value::String(text) => write_string(f, &var, key, text, 1)?,
                other => write_raw(f, &var, key, &other.to_string(), 1)?,
            }
        }
        Ok(())
    }
}

fn write_conditional(f: &mut Formatter<'_>, conditional: &[ConditionalSubspec], level: usize) -> fmt::Result {
    for gated in conditional {
        write!(f, "{}if ${}==1", indent(level), gated.condition)?;
        write_subspec(f, &gated.subspec, level)?;
        writeln!(f, "{}end", indent(level))?;
    }
    Ok(())
}

fn write_subspec(f: &mut Formatter<'_>, tree: &SubspecTree, level: usize) -> fmt::Result {
    let spec = &tree.spec;
    let parent = block_var(level.saturating_sub(1), false);
    let var = block_var(level, spec.test_subspec);
    let method = if spec.test_subspec { "test_spec" } else { "subspec" };
    write!(
        f,
        "\n{}{parent}.{method} \"{}\" do |{var}|\n",
        indent(level),
        spec.output_name
    )?;
    let inner = level + 1;
    write_requires_arc(f, &var, spec, inner)?;
    write_list(f, &var, "compiler_flags", &spec.compiler_flags, inner, false)?;
    write_list(f, &var, "frameworks", &spec.frameworks, inner, false)?;
    if !spec.header_mappings_dir.is_empty() {
        write_string(f, &var, "header_mappings_dir", &spec.header_mappings_dir, inner)?;
    }
    if !spec.header_dir.is_empty() {
        write_string(f, &var, "header_dir", &spec.header_dir, inner)?;
    }
    write_list(f, &var, "libraries", &spec.libraries, inner, false)?;
    write_list(f, &var, "vendored_libraries", &spec.vendored_libraries, inner, true)?;
    write_list(f, &var, "vendored_frameworks", &spec.vendored_frameworks, inner, true)?;
    write_list(f, &var, "public_header_files", &spec.public_header_files, inner, true)?;
    write_list(f, &var, "private_header_files", &spec.private_header_files, inner, true)?;
    write_list(f, &var, "source_files", &spec.source_files, inner, true)?;
    write_list(f, &var, "exclude_files", &spec.exclude_files, inner, true)?;
    if !spec.pod_target_xcconfig.is_empty() {
        let entries = spec
            .pod_target_xcconfig
            .iter()
            .map(|(name, value)| (name.as_str(), HashValue::from_xcconfig(name, value)))
            .collect();
        write_hash(f, &var, "pod_target_xcconfig", &entries, inner)?;
    }
    for dependency in &spec.dependencies {
        write_head(f, &var, "dependency", inner)?;
        match spec.dependency_versions.get(dependency) {
            Some(version) => writeln!(f, "\"{dependency}\", \"{version}\"")?,
            None => writeln!(f, "\"{dependency}\"")?,
        }
    }
    if spec.test_subspec {
        write_head(f, &var, "scheme", inner)?;
        f.write_str("= { :code_coverage => true }\n")?;
    }
    write_conditional(f, &tree.conditional, inner)?;
    for child in &tree.children {
        write_subspec(f, child, inner)?;
    }
    write_resource_bundles(f, &var, spec, inner)?;
    writeln!(f, "{}end", indent(level))
}

fn write_requires_arc(f: &mut Formatter<'_>, var: &str, spec: &SubspecSpec, level: usize) -> fmt::Result {
    match spec.requires_arc.as_slice() {
        [] => Ok(()),
        [flag] if flag == "true" || flag == "false" => write_raw(f, var, "requires_arc", flag, level),
        files => write_list(f, var, "requires_arc", files, level, true),
    }
}

fn write_resource_bundles(f: &mut Formatter<'_>, var: &str, spec: &SubspecSpec, level: usize) -> fmt::Result {
    if spec.resource_bundles.is_empty() {
        return Ok(());
    }
    write_head(f, var, "resource_bundles", level)?;
    f.write_str("= {\n")?;
    let mut remaining = spec.resource_bundles.len();
    for (name, sources) in &spec.resource_bundles {
        let lead = format!("{}\"{name}\" => ", indent(level + 1));
        let pad = " ".repeat(lead.len());
        writeln!(f, "{lead}[")?;
        let listed: Vec<String> = sources.iter().map(|source| format!("{pad}  \"{source}\"")).collect();
        if !listed.is_empty() {
            writeln!(f, "{}", listed.join(",\n"))?;
        }
        write!(f, "{pad}]")?;
        remaining -= 1;
        if remaining > 0 {
            f.write_str(",")?;
        }
        f.write_str("\n")?;
    }
    writeln!(f, "{}}}", indent(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::podspec_tree;
    use crate::graph::Graph;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn graph() -> Graph {
        let doc = json!({
            "build_settings": { "root_path": "/src", "build_dir": "//out/Default/" },
            "targets": {
                "//pod:Lib": {
                    "type": "group",
                    "deps": ["//pod:core"],
                    "metadata": {
                        "output_name": ["Lib.podspec"],
                        "output_path": ["/out/pods"],
                        "global_variables": ["$enable_debug = 0"],
                        "condition_deps": [["//pod:debug", "enable_debug"]],
                        "root_specification": [{
                            "name": "Lib",
                            "version": "1.0.0",
                            "source": { "git": "https://example.com/lib.git", "tag": "1.0.0" },
                            "ios": { "deployment_target": "10.0" },
                            "static_framework": true,
                            "prepare_command": ["echo one", "echo two"],
                        }],
                    },
                },
                "//pod:core": {
                    "type": "source_set",
                    "sources": ["//core/a.cc", "//core/a.h"],
                    "metadata": {
                        "is_subspec_target": [true],
                        "output_name": ["Core"],
                        "requires_arc": [true],
                        "frameworks": ["Foundation"],
                        "header_dir": ["Core"],
                        "dependency": [["Dep", "1.2.0"], "Other"],
                        "pod_target_xcconfig": [{
                            "GCC_PREPROCESSOR_DEFINITIONS": ["A=1", "B=1"],
                            "HEADER_SEARCH_PATHS": ["//core/include", "//PODS_ROOT/Lib"],
                        }],
                        "resource_bundles": ["//pod:assets"],
                    },
                },
                "//pod:assets": { "type": "bundle_data", "sources": ["//res/a.png"] },
                "//pod:debug": {
                    "type": "source_set",
                    "sources": ["//debug/d.cc"],
                    "metadata": { "output_name": ["Debug"], "test_subspec": [true] },
                },
            },
        });
        Graph::from_json_str(&doc.to_string()).expect("graph")
    }

    fn render(graph: &Graph) -> GeneratedFile {
        let tree = podspec_tree(graph, "//pod:Lib").expect("tree");
        generate(&tree).expect("render")
    }

    #[rstest]
    fn names_file_after_output_name(graph: Graph) {
        assert_eq!(render(&graph).path, "/out/pods/Lib.podspec");
    }

    #[rstest]
    fn renders_root_specification(graph: Graph) {
        let text = render(&graph).contents;
        assert!(text.starts_with(HEADER));
        assert!(text.contains("\n$enable_debug = 0\n\nPod::Spec.new do |p|\n"));
        assert!(text.contains("  p.ios.deployment_target       = \"10.0\"\n"));
        assert!(text.contains("  p.name                        = \"Lib\"\n"));
        assert!(text.contains("  p.static_framework            = true\n"));
        assert!(text.contains(
            "  p.source                      = {\n    :git => \"https://example.com/lib.git\",\n    :tag => \"1.0.0\"\n  }\n"
        ));
        assert!(text.contains("  p.prepare_command             = <<-CMD\n    echo one\n    echo two\n  CMD\n"));
        assert!(text.ends_with("  end\nend\n"));
    }

    #[rstest]
    fn renders_subspec_attributes(graph: Graph) {
        let text = render(&graph).contents;
        assert!(text.contains("\n  p.subspec \"Core\" do |sp|\n"));
        assert!(text.contains("    sp.requires_arc               = true\n"));
        assert!(text.contains("    sp.frameworks                 = \"Foundation\"\n"));
        assert!(text.contains("    sp.header_dir                 = \"Core\"\n"));
        assert!(text.contains("    sp.private_header_files       = \"core/a.h\"\n"));
        assert!(text.contains(
            "    sp.source_files               = \"core/a.cc\",\n                                    \"core/a.h\"\n"
        ));
        assert!(text.contains("    sp.dependency                 \"Dep\", \"1.2.0\"\n"));
        assert!(text.contains("    sp.dependency                 \"Other\"\n"));
        assert!(text.contains("      \"HEADER_SEARCH_PATHS\" => \"\\\"${PODS_ROOT}/Lib\\\" \\\n"));
        assert!(text.contains("\\\"${PODS_TARGET_SRCROOT}/core/include\\\"\"\n"));
        assert!(text.contains("      \"assets\" => [\n"));
    }

    #[rstest]
    fn renders_conditional_test_spec(graph: Graph) {
        let text = render(&graph).contents;
        assert!(text.contains("  if $enable_debug==1\n  p.test_spec \"Debug\" do |test_spec|\n"));
        assert!(text.contains("    test_spec.scheme              = { :code_coverage => true }\n"));
        assert!(text.contains("  end\n  end\nend\n"));
    }

    #[rstest]
    #[case("//PODS_ROOT/x", "\\\"${PODS_ROOT}/x\\\"")]
    #[case("//TARGET_BUILD_DIR/h", "\\\"${TARGET_BUILD_DIR}/h\\\"")]
    #[case("//core/include", "\\\"${PODS_TARGET_SRCROOT}/core/include\\\"")]
    #[case("/abs/include", "\\\"/abs/include\\\"")]
    fn rewrites_search_paths(#[case] include: &str, #[case] expected: &str) {
        assert_eq!(search_path(include), expected);
    }

    #[rstest]
    fn missing_output_name_is_rejected() {
        let doc = json!({
            "build_settings": { "root_path": "/src", "build_dir": "//out/" },
            "targets": { "//pod:Lib": { "type": "group" } },
        });
        let graph = Graph::from_json_str(&doc.to_string()).expect("graph");
        let tree = podspec_tree(&graph, "//pod:Lib").expect("tree");
        assert!(matches!(generate(&tree), Err(RenderError::MissingOutputName { .. })));
    }
}
