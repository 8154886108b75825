//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. `build.rs`
//! includes it directly to render the manual page, so it depends on nothing
//! but clap and the standard library.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Translate a GN project description into CMake fragments and podspecs.
#[derive(Debug, Parser)]
#[command(name = "gnbridge", author, version, about, long_about = None)]
pub struct Cli {
    /// Resolve relative paths against this directory.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Generator to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available top-level commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Write CMake fragments for the given roots.
    Cmake(CmakeArgs),

    /// Write podspecs for the given roots.
    Podspec(PodspecArgs),

    /// Print the resolved dependency structure of one root as JSON.
    Resolve(ResolveArgs),
}

/// Arguments accepted by the `cmake` command.
#[derive(Debug, Clone, Args)]
pub struct CmakeArgs {
    /// Project description written by `gn gen --ide=json`.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Root labels to generate. Read from `cmake_targets/` beside the
    /// project file when omitted.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Directory holding `copy_files.py` and `action_foreach_files.py`.
    /// Defaults to the project file's directory.
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,
}

/// Arguments accepted by the `podspec` command.
#[derive(Debug, Clone, Args)]
pub struct PodspecArgs {
    /// Project description written by `gn gen --ide=json`.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Root labels to generate. Read from `podspec_targets/` beside the
    /// project file when omitted.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

/// Arguments accepted by the `resolve` command.
#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Project description written by `gn gen --ide=json`.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Root label to resolve.
    #[arg(value_name = "TARGET")]
    pub target: String,
}
