//! gnbridge core library.
//!
//! Loads the project description written by `gn gen --ide=json`, resolves
//! the dependency structure below requested roots and renders CMake
//! fragments or CocoaPods podspecs from it.

pub mod ast;
pub mod cli;
pub mod cmake_gen;
pub mod flatten;
pub mod generated;
pub mod graph;
pub mod paths;
pub mod podspec_gen;
pub mod resolve;
pub mod runner;
