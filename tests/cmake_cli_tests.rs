//! Integration tests for the `cmake` and `resolve` commands.
//!
//! These tests invoke the compiled binary against the fixture project in
//! `tests/data/cmake` and inspect the files it writes into a scratch
//! directory passed through `-C`.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/cmake/project.json")
}

fn gnbridge() -> Result<Command> {
    Command::cargo_bin("gnbridge").context("locate gnbridge binary")
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

#[test]
fn listed_roots_are_generated() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    gnbridge()?
        .arg("-C")
        .arg(temp.path())
        .arg("cmake")
        .arg(fixture())
        .assert()
        .success()
        .stderr(predicate::str::contains("//third_party/rs:rs"));

    let impl_dir = temp.path().join("generated/CMakeLists_impl/Default");
    let app = read(&impl_dir.join("CMakeLists.txt"))?;
    ensure!(app.contains("project (app)"), "missing project line:\n{app}");
    ensure!(
        app.contains("add_library(app_shared SHARED"),
        "missing main target:\n{app}"
    );
    ensure!(
        app.contains("add_dependencies(app_shared \n  app_assets\n  )"),
        "root should wait for the copy action:\n{app}"
    );
    ensure!(
        app.contains(
            "add_subdirectory(${CMAKE_CURRENT_SOURCE_DIR}/CMakeLists_impl/Default/plug \n  plug\n  )"
        ),
        "missing nested project:\n{app}"
    );
    ensure!(
        app.contains("target_link_libraries(app_shared\n  Threads::Threads\n  base_static\n  log\n  plug\n  )"),
        "unexpected link libraries:\n{app}"
    );
    ensure!(!app.contains("app_headers"), "header-only library should be dropped");

    let plug = read(&impl_dir.join("plug/CMakeLists.txt"))?;
    ensure!(
        plug.contains("$<TARGET_OBJECTS:app_util>"),
        "nested root should reuse parent objects:\n{plug}"
    );
    ensure!(
        !plug.contains("add_library(app_util OBJECT"),
        "nested root must not redeclare parent objects:\n{plug}"
    );

    let base = read(&temp.path().join("generated/base/CMakeLists_impl/Default/CMakeLists.txt"))?;
    ensure!(base.contains("add_library(base_static STATIC"), "missing base target:\n{base}");
    Ok(())
}

#[test]
fn failing_root_does_not_stop_the_others() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    gnbridge()?
        .arg("-C")
        .arg(temp.path())
        .arg("cmake")
        .arg(fixture())
        .arg("//missing:target")
        .arg("//app:app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("//missing:target"));
    ensure!(
        temp.path()
            .join("generated/CMakeLists_impl/Default/CMakeLists.txt")
            .exists(),
        "the valid root should still be written"
    );
    Ok(())
}

#[test]
fn missing_target_lists_fail() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let project = temp.path().join("project.json");
    fs::copy(fixture(), &project).context("copy fixture")?;
    gnbridge()?
        .arg("cmake")
        .arg(&project)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cmake_targets"));
    Ok(())
}

#[test]
fn resolve_prints_summary() -> Result<()> {
    let output = gnbridge()?
        .arg("resolve")
        .arg(fixture())
        .arg("//app:app")
        .output()
        .context("run gnbridge resolve")?;
    ensure!(output.status.success(), "resolve should succeed");
    let summary: Value = serde_json::from_slice(&output.stdout).context("parse summary")?;
    ensure!(summary["identifier"] == "app_app", "identifier: {summary}");
    ensure!(
        summary["source_units"] == serde_json::json!(["//app:app", "//app:assets", "//app:util"]),
        "source units: {summary}"
    );
    ensure!(
        summary["barrier_units"] == serde_json::json!(["//base:base"]),
        "barrier units: {summary}"
    );
    ensure!(
        summary["unsupported"] == serde_json::json!(["//third_party/rs:rs"]),
        "unsupported: {summary}"
    );
    ensure!(
        summary["linked_outputs"] == serde_json::json!(["plug"]),
        "linked outputs: {summary}"
    );
    ensure!(
        summary["children"][0]["root"] == "//plug:plug",
        "children: {summary}"
    );
    ensure!(
        summary["packages"]["Threads"]["linked_modules"] == serde_json::json!(["Threads::Threads"]),
        "packages: {summary}"
    );
    Ok(())
}
