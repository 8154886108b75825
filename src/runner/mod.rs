//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution. Each requested root is generated on its own: a
//! failing root is logged and the remaining roots still run, and the command
//! reports failure once all of them were attempted.

mod error;
mod output;
mod path_helpers;
mod targets;

pub use error::RunnerError;

use crate::cli::{Cli, CmakeArgs, Commands, PodspecArgs, ResolveArgs};
use crate::flatten::podspec_tree;
use crate::generated::GeneratedFile;
use crate::graph::Graph;
use crate::paths::HelperScripts;
use crate::resolve::{ResolutionSummary, resolve_tree};
use crate::{cmake_gen, podspec_gen};
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};
use tracing::{debug, error, info, warn};

use path_helpers::{project_dir, resolve_input_path, resolve_output_path};

/// Directory beside the project file listing CMake roots.
pub const CMAKE_TARGETS_DIR: &str = "cmake_targets";
/// Directory beside the project file listing podspec roots.
pub const PODSPEC_TARGETS_DIR: &str = "podspec_targets";

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded, no roots are requested,
/// or any root fails to generate.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Cmake(args) => handle_cmake(cli, args),
        Commands::Podspec(args) => handle_podspec(cli, args),
        Commands::Resolve(args) => handle_resolve(cli, args),
    }
}

fn handle_cmake(cli: &Cli, args: &CmakeArgs) -> Result<()> {
    let project = resolve_input_path(cli, &args.project)?;
    let graph = load_graph(&project)?;
    for (identifier, labels) in graph.identifier_collisions() {
        warn!(%identifier, labels = ?labels, "labels share a CMake identifier");
    }
    let scripts = HelperScripts::new(match &args.script_dir {
        Some(dir) => resolve_input_path(cli, dir)?,
        None => project_dir(&project),
    });
    let roots = requested_roots(&args.targets, &project, CMAKE_TARGETS_DIR, "cmake")?;
    for_each_root("cmake", &roots, |root| {
        let node = graph.lookup(root)?;
        if node.metadata.cmake.is_only_sub_cmake {
            info!(label = root, "skipping root only emitted as a nested project");
            return Ok(());
        }
        let tree = resolve_tree(&graph, root)?;
        let files = cmake_gen::generate(&graph, &tree, &scripts)?;
        write_files(cli, &files)
    })
}

fn handle_podspec(cli: &Cli, args: &PodspecArgs) -> Result<()> {
    let project = resolve_input_path(cli, &args.project)?;
    let graph = load_graph(&project)?;
    let roots = requested_roots(&args.targets, &project, PODSPEC_TARGETS_DIR, "podspec")?;
    for_each_root("podspec", &roots, |root| {
        let tree = podspec_tree(&graph, root)?;
        let file = podspec_gen::generate(&tree)?;
        write_files(cli, std::slice::from_ref(&file))
    })
}

fn handle_resolve(cli: &Cli, args: &ResolveArgs) -> Result<()> {
    let project = resolve_input_path(cli, &args.project)?;
    let graph = load_graph(&project)?;
    let tree = resolve_tree(&graph, &args.target)?;
    let summary = ResolutionSummary::from(&tree);
    let json = serde_json::to_string_pretty(&summary).context("failed to serialise resolution")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}").context("failed to write to stdout")?;
    Ok(())
}

/// Read and parse the project description at `path`.
fn load_graph(path: &Utf8Path) -> Result<Graph> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read project {path}"))?;
    let graph = Graph::from_json_str(&text).with_context(|| format!("failed to load project {path}"))?;
    debug!(%path, "loaded project");
    Ok(graph)
}

/// Roots named on the command line, else those listed beside the project.
fn requested_roots(
    explicit: &[String],
    project: &Utf8Path,
    list_dir: &str,
    kind: &'static str,
) -> Result<Vec<String>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }
    let directory = project_dir(project).join(list_dir);
    let found = targets::discover(&directory)?;
    if found.is_empty() {
        return Err(RunnerError::NoTargets { kind, directory }.into());
    }
    Ok(found)
}

/// Run `generate` for every root, logging failures as they happen.
fn for_each_root<F>(kind: &str, roots: &[String], mut generate: F) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let mut failed = 0;
    for root in roots {
        if let Err(err) = generate(root) {
            failed += 1;
            let message = format!("{err:#}");
            error!(label = %root, error = %message, "failed to generate {kind}");
        }
    }
    if failed > 0 {
        return Err(RunnerError::RootsFailed {
            failed,
            total: roots.len(),
        }
        .into());
    }
    Ok(())
}

fn write_files(cli: &Cli, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let path = resolve_output_path(cli, &file.path);
        output::write_file(&path, &file.contents)?;
    }
    Ok(())
}
