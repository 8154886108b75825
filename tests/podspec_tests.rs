//! End-to-end validation of podspec generation.
//!
//! The `podspec` command runs against the fixture in `tests/data/podspec`,
//! which flattens one subspec into another, and the written file is
//! snapshotted with `insta`.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use gnbridge::flatten::{FlattenError, podspec_tree};
use gnbridge::graph::Graph;
use insta::{Settings, assert_snapshot};
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/podspec/project.json")
}

#[test]
fn listed_podspec_is_written() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    Command::cargo_bin("gnbridge")
        .context("locate gnbridge binary")?
        .arg("-C")
        .arg(temp.path())
        .arg("podspec")
        .arg(fixture())
        .assert()
        .success();

    let path = temp.path().join("pods/Tiny.podspec");
    ensure!(path.exists(), "podspec should be written to {}", path.display());
    let contents = fs::read_to_string(&path).context("read podspec")?;

    let mut settings = Settings::new();
    settings.set_snapshot_path(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/snapshots/podspec"));
    settings.bind(|| {
        assert_snapshot!("tiny_podspec", contents);
    });
    Ok(())
}

#[rstest]
#[case("//pod:extra", "is not a subspec target")]
#[case("//pod:gone", "unknown target `//pod:gone`")]
fn bad_flatten_deps_fail(#[case] flattened: &str, #[case] message: &str) {
    let text = fs::read_to_string(fixture()).expect("read fixture");
    let mut doc: serde_json::Value = serde_json::from_str(&text).expect("parse fixture");
    doc["targets"]["//pod:core"]["metadata"]["flatten_deps"] = serde_json::json!([flattened]);
    let graph = Graph::from_json_str(&doc.to_string()).expect("graph");
    let err = podspec_tree(&graph, "//pod:Tiny").expect_err("flatten should fail");
    ensure_message(&err, message);
}

fn ensure_message(err: &FlattenError, expected: &str) {
    let rendered = err.to_string();
    assert!(rendered.contains(expected), "unexpected error: {rendered}");
}
