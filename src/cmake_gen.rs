//! CMake fragment generator.
//!
//! Converts a [`ResolvedTree`] into one CMake file per root. Each file
//! declares an object library per source unit, custom commands for script
//! actions, and the root's main target linking everything together. Nested
//! roots land in sub-directories of their parent and are pulled in with
//! `add_subdirectory`.
//!
//! Units are emitted in label order and every set is sorted so the output is
//! stable across runs.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::generated::{GeneratedFile, RenderError};
use crate::graph::{Graph, GraphNode, TargetKind};
use crate::paths::{HelperScripts, PathRewriter};
use crate::resolve::{PackageRequirements, ResolvedGraph, ResolvedTree};

const IMPL_DIR: &str = "CMakeLists_impl";
const DEFAULT_FILE_NAME: &str = "CMakeLists.txt";
const RESPONSE_FILE_PLACEHOLDER: &str = "{{response_file_name}}";

/// Render every root of `tree`.
///
/// The returned list holds the CMake files, outermost root first, followed
/// by the response files script actions refer to.
///
/// # Errors
///
/// Returns [`RenderError::NotLinkable`] when a root does not produce a
/// linkable artefact and [`RenderError::MissingOutputPath`] when the
/// outermost root has no `output_path` metadata.
pub fn generate(
    graph: &Graph,
    tree: &ResolvedTree<'_>,
    scripts: &HelperScripts,
) -> Result<Vec<GeneratedFile>, RenderError> {
    let root = tree.resolved.root;
    let output_path = root
        .metadata
        .cmake
        .output_path
        .as_deref()
        .filter(|path| !path.is_empty())
        .ok_or_else(|| RenderError::MissingOutputPath { id: root.id.clone() })?;
    let build_dir_name = Utf8Path::new(graph.build_path()).file_name().unwrap_or_default();
    let generator = Generator {
        graph,
        rewriter: PathRewriter::new(graph.root_path()),
        scripts,
    };
    let mut files = Vec::new();
    let mut response_files = Vec::new();
    generator.render(
        tree,
        &Placement {
            output_path: Utf8Path::new(output_path),
            rel_dir: Utf8PathBuf::from(IMPL_DIR).join(build_dir_name),
            outermost: true,
        },
        &Inherited::default(),
        &mut files,
        &mut response_files,
    )?;
    files.extend(response_files);
    Ok(files)
}

/// Escape `value` for use inside a CMake string.
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace('"', "\\\"")
}

/// Where a root's file lands.
struct Placement<'a> {
    output_path: &'a Utf8Path,
    rel_dir: Utf8PathBuf,
    outermost: bool,
}

/// What ancestors of a nested root already declared.
#[derive(Debug, Clone, Default)]
struct Inherited {
    emitted: BTreeSet<String>,
    search_path_vars: BTreeSet<String>,
}

struct Generator<'a> {
    graph: &'a Graph,
    rewriter: PathRewriter<'a>,
    scripts: &'a HelperScripts,
}

impl Generator<'_> {
    fn render(
        &self,
        tree: &ResolvedTree<'_>,
        placement: &Placement<'_>,
        inherited: &Inherited,
        files: &mut Vec<GeneratedFile>,
        response_files: &mut Vec<GeneratedFile>,
    ) -> Result<(), RenderError> {
        let resolved = &tree.resolved;
        let root = resolved.root;
        let Some(kind) = root.kind.filter(|kind| kind.traits().linkable) else {
            return Err(RenderError::NotLinkable {
                id: root.id.clone(),
                kind: root.raw_kind.clone().unwrap_or_default(),
            });
        };

        let fresh_units: Vec<&GraphNode> = resolved
            .source_units
            .values()
            .filter(|unit| !inherited.emitted.contains(unit.id.as_str()))
            .copied()
            .collect();
        let mut blocks = Vec::with_capacity(fresh_units.len());
        for unit in fresh_units {
            if let Some(block) = self.unit_block(unit, resolved, response_files) {
                blocks.push(block);
            }
        }

        let subdirectories = tree
            .children
            .iter()
            .map(|child| {
                let name = child.resolved.root.output_name.as_str();
                let path = if placement.outermost {
                    format!("${{CMAKE_CURRENT_SOURCE_DIR}}/{}/{name}", placement.rel_dir)
                } else {
                    format!("${{CMAKE_CURRENT_SOURCE_DIR}}/{name}")
                };
                (path, name)
            })
            .collect();

        let contents = CmakeFile {
            generator: self,
            tree,
            kind,
            blocks,
            subdirectories,
            inherited,
        }
        .to_string();
        let file_name = Some(root.metadata.cmake.file_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME);
        files.push(GeneratedFile::new(
            placement.output_path.join(&placement.rel_dir).join(file_name),
            contents,
        ));

        let mut next = inherited.clone();
        next.emitted.insert(root.id.clone());
        next.emitted.extend(resolved.source_units.keys().map(|id| (*id).to_owned()));
        next.search_path_vars
            .extend(resolved.barrier_units.values().map(|unit| search_path_var(unit)));
        for child in &tree.children {
            let child_placement = Placement {
                output_path: placement.output_path,
                rel_dir: placement.rel_dir.join(&child.resolved.root.output_name),
                outermost: false,
            };
            self.render(child, &child_placement, &next, files, response_files)?;
        }
        Ok(())
    }

    fn unit_block<'n>(
        &self,
        unit: &'n GraphNode,
        resolved: &ResolvedGraph<'_>,
        response_files: &mut Vec<GeneratedFile>,
    ) -> Option<UnitBlock<'n>> {
        match unit.kind? {
            TargetKind::Copy => {
                if unit.sources.is_empty() || unit.outputs.is_empty() {
                    return None;
                }
                let args = std::iter::once("--sources".to_owned())
                    .chain(self.rewriter.symbolic_all(&unit.sources))
                    .chain(std::iter::once("--destinations".to_owned()))
                    .chain(self.rewriter.symbolic_all(&unit.outputs))
                    .collect();
                Some(self.script_block(unit, TargetKind::Copy, self.scripts.copy_files().as_str(), args))
            }
            TargetKind::Action => {
                let args = self.response_args(unit, response_files);
                let script = unit.script.clone().unwrap_or_default();
                Some(self.script_block(unit, TargetKind::Action, &script, args))
            }
            TargetKind::ActionForeach => {
                let forwarded = format!(
                    "@&{}",
                    self.rewriter
                        .symbolic_all(&self.response_args(unit, response_files))
                        .join("@&")
                );
                let args = vec![
                    "--script".to_owned(),
                    self.rewriter.symbolic(unit.script.as_deref().unwrap_or_default()),
                    "--arguments".to_owned(),
                    forwarded,
                    "--sources".to_owned(),
                    "${${action_foreach_target}__sources}".to_owned(),
                    "--target-dir".to_owned(),
                    self.rewriter.symbolic(unit.label_dir()),
                    "--gn-out-dir".to_owned(),
                    self.rewriter.symbolic(self.graph.build_path()),
                    "--root-dir".to_owned(),
                    self.rewriter.symbolic(self.graph.root_path()),
                ];
                Some(self.script_block(
                    unit,
                    TargetKind::ActionForeach,
                    self.scripts.action_foreach_files().as_str(),
                    args,
                ))
            }
            _ if unit.sources.is_empty() => None,
            _ => Some(UnitBlock::Objects {
                unit,
                actions: resolved
                    .script_actions_of(&unit.id)
                    .map(|actions| actions.iter().cloned().collect())
                    .unwrap_or_default(),
            }),
        }
    }

    fn script_block<'n>(
        &self,
        unit: &'n GraphNode,
        kind: TargetKind,
        script: &str,
        args: Vec<String>,
    ) -> UnitBlock<'n> {
        let depends_on = unit
            .deps
            .iter()
            .filter_map(|dep| self.graph.lookup(dep).ok())
            .filter(|dep| dep.kind.is_some_and(|dep_kind| dep_kind != TargetKind::SourceSet))
            .map(|dep| dep.cmake_name().to_owned())
            .collect();
        UnitBlock::Script(ScriptBlock {
            unit,
            kind,
            script: self.rewriter.symbolic(script),
            args,
            sources: self.rewriter.symbolic_all(&unit.sources),
            outputs: self.rewriter.symbolic_all(&unit.outputs),
            working_dir: self.rewriter.symbolic(self.graph.build_path()),
            depends_on,
        })
    }

    /// Write the response file of `unit`, returning its arguments with the
    /// placeholder replaced by the file's path.
    fn response_args(&self, unit: &GraphNode, response_files: &mut Vec<GeneratedFile>) -> Vec<String> {
        let mut args = unit.args.clone();
        if unit.response_file_contents.is_empty() || args.is_empty() {
            return args;
        }
        let path = Utf8Path::new(self.graph.build_path())
            .join("rsp_files")
            .join(format!("{}.rsp", unit.cmake_name()));
        let contents = unit
            .response_file_contents
            .iter()
            .map(|line| format!("{line}\n"))
            .collect();
        if let Some(slot) = args.iter_mut().find(|arg| arg.as_str() == RESPONSE_FILE_PLACEHOLDER) {
            *slot = path.to_string();
        }
        response_files.push(GeneratedFile::new(path, contents));
        args
    }
}

fn search_path_var(unit: &GraphNode) -> String {
    format!("{}_search_path", unit.cmake_name())
}

/// Whether the unit is declared as an object library.
fn has_objects(unit: &GraphNode) -> bool {
    unit.kind.is_some_and(|kind| !kind.is_script()) && !unit.sources.is_empty()
}

enum UnitBlock<'n> {
    Objects { unit: &'n GraphNode, actions: Vec<String> },
    Script(ScriptBlock<'n>),
}

struct ScriptBlock<'n> {
    unit: &'n GraphNode,
    kind: TargetKind,
    script: String,
    args: Vec<String>,
    sources: Vec<String>,
    outputs: Vec<String>,
    working_dir: String,
    depends_on: BTreeSet<String>,
}

struct CmakeFile<'a> {
    generator: &'a Generator<'a>,
    tree: &'a ResolvedTree<'a>,
    kind: TargetKind,
    blocks: Vec<UnitBlock<'a>>,
    subdirectories: Vec<(String, &'a str)>,
    inherited: &'a Inherited,
}

impl Display for CmakeFile<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let resolved = &self.tree.resolved;
        let root = resolved.root;
        let rewriter = &self.generator.rewriter;
        self.write_header(f, root)?;
        write!(f, "set(ROOT_PATH {})\n\n", self.generator.graph.root_path())?;
        f.write_str("enable_language(ASM)\n\n")?;
        write_find_packages(f, rewriter, &resolved.packages)?;

        for block in &self.blocks {
            match block {
                UnitBlock::Objects { unit, actions } => write_object_library(f, rewriter, unit, actions)?,
                UnitBlock::Script(script) => write!(f, "{script}")?,
            }
        }

        let name = root.output_name.as_str();
        let traits = self.kind.traits();
        write!(f, "\n# Main target\n{}({name}", traits.command)?;
        if let Some(modifier) = traits.modifier {
            write!(f, " {modifier}")?;
        }
        f.write_str("\n  ")?;
        for unit in resolved.source_units.values().filter(|unit| has_objects(unit)) {
            write!(f, "\n  $<TARGET_OBJECTS:{}>\n  ", unit.cmake_name())?;
        }
        f.write_str(")\n\n")?;

        if let Some(actions) = resolved.root_script_actions().filter(|actions| !actions.is_empty()) {
            write_list(f, "add_dependencies", name, &actions.iter().collect::<Vec<_>>())?;
        }
        if !root.lib_dirs.is_empty() {
            write_link_directories(f, name, &rewriter.symbolic_all(&root.lib_dirs))?;
        }
        self.write_barrier_search_paths(f, root)?;

        if !self.subdirectories.is_empty() {
            f.write_str("\n# subdirectory\n")?;
        }
        for (path, output) in &self.subdirectories {
            write_single(f, "add_subdirectory", path, output)?;
        }

        let libs: BTreeSet<&str> = root
            .libs
            .iter()
            .map(String::as_str)
            .chain(self.tree.linked_outputs.iter().copied())
            .chain(resolved.linked_modules())
            .chain(resolved.barrier_units.values().map(|unit| unit.output_name.as_str()))
            .collect();
        if !libs.is_empty() {
            write_list(f, "target_link_libraries", name, &libs.into_iter().collect::<Vec<_>>())?;
        }

        if !root.ldflags.is_empty() {
            f.write_str("# Compiler and Linker flags\n")?;
            write_files_property(f, self.kind.linker_flags_variable(), &root.ldflags)?;
        }
        Ok(())
    }
}

impl CmakeFile<'_> {
    fn write_header(&self, f: &mut Formatter<'_>, root: &GraphNode) -> fmt::Result {
        let cmake = &root.metadata.cmake;
        let dir = root.label_dir();
        let separator = if dir.len() > 2 { "/" } else { "" };
        f.write_str("# Automatically generated by gnbridge\n")?;
        writeln!(f, "# Please modify configs of compilation in {dir}{separator}BUILD.gn")?;
        f.write_str("\n# Set the minimum version of CMAKE that is required\n")?;
        writeln!(f, "cmake_minimum_required(VERSION {})", cmake.cmake_version)?;
        if !cmake.project_name.is_empty() {
            writeln!(f, "project ({})", cmake.project_name)?;
        }
        f.write_str("\n\n")
    }

    fn write_barrier_search_paths(&self, f: &mut Formatter<'_>, root: &GraphNode) -> fmt::Result {
        let rewriter = &self.generator.rewriter;
        let root_dir = rewriter.symbolic(root.label_dir());
        let mut dirs = BTreeSet::new();
        for unit in self.tree.resolved.barrier_units.values() {
            let var = search_path_var(unit);
            if !self.inherited.search_path_vars.contains(&var) {
                write_single(f, "set", &var, "${CMAKE_LIBRARY_OUTPUT_DIRECTORY}")?;
                write!(f, "string(REPLACE \n\"\\\\\" \n\"/\" \n{var} \n${{{var}}}) \n\n")?;
                write!(
                    f,
                    "string(REPLACE \n{root_dir} \n{} \n{var} \n${{{var}}}) \n\n",
                    rewriter.symbolic(unit.label_dir())
                )?;
            }
            dirs.insert(format!("${{{var}}}"));
        }
        if dirs.is_empty() {
            return Ok(());
        }
        write_link_directories(f, &root.output_name, &dirs.into_iter().collect::<Vec<_>>())
    }
}

impl Display for ScriptBlock<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let var = format!("{}_target", self.kind);
        let sources_var = format!("${{{var}}}__sources");
        let outputs_var = format!("${{{var}}}__output");
        write_single(f, "set", &var, self.unit.cmake_name())?;
        write_list(f, "set", &sources_var, &self.sources)?;
        write_list(f, "set", &outputs_var, &self.outputs)?;

        writeln!(f, "add_custom_command(OUTPUT ${{{outputs_var}}}")?;
        let output_dirs: BTreeSet<&str> = self
            .outputs
            .iter()
            .filter_map(|output| output.rsplit_once('/').map(|(dir, _)| dir))
            .filter(|dir| !dir.is_empty())
            .collect();
        if !output_dirs.is_empty() {
            writeln!(
                f,
                "  COMMAND ${{CMAKE_COMMAND}} -E make_directory \"{}\"",
                output_dirs.iter().map(|dir| escape(dir)).join("\" \"")
            )?;
        }
        write!(f, "  COMMAND python3 \"{}\"", escape(&self.script))?;
        if !self.args.is_empty() {
            write!(
                f,
                "\n    \"{}\"",
                self.args.iter().map(|arg| escape(arg)).join("\"\n    \"")
            )?;
        }
        writeln!(f)?;
        writeln!(f, "  DEPENDS ${{{sources_var}}}")?;
        writeln!(f, "  WORKING_DIRECTORY \"{}\"", escape(&self.working_dir))?;
        writeln!(f, "  COMMENT \"{}: ${{{var}}}\"", self.kind)?;
        f.write_str("  VERBATIM)\n")?;

        write!(
            f,
            "add_custom_target(${{{var}}} SOURCES ${{{sources_var}}} DEPENDS ${{{outputs_var}}})\n\n"
        )?;

        if !self.depends_on.is_empty() {
            write!(f, "add_dependencies(\"${{{var}}}\"")?;
            for dep in &self.depends_on {
                write!(f, "\n  \"{dep}\"")?;
            }
            f.write_str(")\n\n")?;
        }
        writeln!(f)
    }
}

fn write_find_packages(
    f: &mut Formatter<'_>,
    rewriter: &PathRewriter<'_>,
    packages: &PackageRequirements,
) -> fmt::Result {
    for (name, requirement) in packages.iter() {
        let paths: Vec<String> = requirement
            .search_paths
            .iter()
            .map(|path| rewriter.symbolic(path))
            .collect();
        let mut head = name.to_owned();
        if requirement.requires_config {
            head.push_str(" REQUIRED CONFIG");
        }
        if !paths.is_empty() {
            head.push_str(" PATHS");
        }
        write_list(f, "find_package", &head, &paths)?;
    }
    Ok(())
}

fn write_object_library(
    f: &mut Formatter<'_>,
    rewriter: &PathRewriter<'_>,
    unit: &GraphNode,
    actions: &[String],
) -> fmt::Result {
    let id = unit.cmake_name();
    write_command_list(
        f,
        "add_library",
        id,
        "OBJECT EXCLUDE_FROM_ALL",
        &rewriter.symbolic_all(&unit.sources),
    )?;
    let defines: Vec<&String> = unit.defines.iter().sorted().dedup().collect();
    write_command_list(f, "target_compile_definitions", id, "PRIVATE", &defines)?;
    write_command_list(
        f,
        "target_include_directories",
        id,
        "PRIVATE",
        &rewriter.symbolic_all(&unit.include_dirs),
    )?;
    if !unit.asmflags.is_empty() {
        write_compile_options(f, id, "ASM", unit.asmflags.iter())?;
    }
    if !unit.cflags.is_empty() || !unit.cflags_c.is_empty() {
        write_compile_options(f, id, "C", unit.cflags.iter().chain(&unit.cflags_c))?;
    }
    if !unit.cflags.is_empty() || !unit.cflags_cc.is_empty() {
        write_compile_options(f, id, "CXX", unit.cflags.iter().chain(&unit.cflags_cc))?;
    }
    let modules: BTreeSet<&str> = unit
        .metadata
        .cmake
        .find_and_link_packages
        .iter()
        .flat_map(|package| package.modules.iter().map(String::as_str))
        .collect();
    for module in modules {
        write_single(f, "target_link_libraries", id, module)?;
    }
    if !actions.is_empty() {
        write_list(f, "add_dependencies", id, actions)?;
    }
    Ok(())
}

fn write_single(f: &mut Formatter<'_>, command: &str, name: &str, value: &str) -> fmt::Result {
    if name.is_empty() {
        write!(f, "{command}(")?;
    } else {
        write!(f, "{command}({} \n  ", escape(name))?;
    }
    write!(f, "{}\n  )\n\n", escape(value))
}

fn write_list<S: AsRef<str>>(f: &mut Formatter<'_>, command: &str, name: &str, values: &[S]) -> fmt::Result {
    match values {
        [] => write_single(f, command, name, ""),
        [only] => write_single(f, command, name, only.as_ref()),
        _ => {
            write!(f, "{command}({}", escape(name))?;
            write!(
                f,
                "\n  {}\n  )\n\n",
                values.iter().map(|value| escape(value.as_ref())).join("\n  ")
            )
        }
    }
}

fn write_command_list<S: AsRef<str>>(
    f: &mut Formatter<'_>,
    command: &str,
    target: &str,
    level: &str,
    values: &[S],
) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    write!(
        f,
        "{command}({} {}\n  {}\n  )\n\n",
        escape(target),
        escape(level),
        values.iter().map(|value| escape(value.as_ref())).join("\n  ")
    )
}

fn write_compile_options<'v>(
    f: &mut Formatter<'_>,
    target: &str,
    language: &str,
    values: impl Iterator<Item = &'v String>,
) -> fmt::Result {
    write!(
        f,
        "target_compile_options({} PRIVATE\n  $<$<COMPILE_LANGUAGE:{language}>: \"SHELL:{}\" >\n  )\n\n",
        escape(target),
        values.map(|value| escape(value)).join(" ")
    )
}

fn write_link_directories<S: AsRef<str>>(f: &mut Formatter<'_>, target: &str, paths: &[S]) -> fmt::Result {
    write!(f, "target_link_directories({target} PUBLIC  ")?;
    for path in paths {
        write!(f, "\n  {}", escape(path.as_ref()))?;
    }
    f.write_str("\n  )\n\n")
}

fn write_files_property(f: &mut Formatter<'_>, property: &str, values: &[String]) -> fmt::Result {
    write!(f, "set({property} \"${{{property}}} ")?;
    for value in values {
        write!(f, "{} ", escape(value))?;
    }
    f.write_str("\")\n\n")
}
