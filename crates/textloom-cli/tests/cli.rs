use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn loom() -> Command {
    Command::cargo_bin("loom").unwrap()
}

fn init(dir: &Path, text: &str) -> PathBuf {
    let file = dir.join("doc.json");
    loom()
        .arg("init")
        .arg(&file)
        .args(["--text", text])
        .assert()
        .success();
    file
}

fn add(file: &Path, text: &str, ai: bool) -> String {
    let mut cmd = loom();
    cmd.arg("add").arg(file).args(["--text", text]);
    if ai {
        cmd.arg("--ai");
    }
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap().trim().to_string()
}

#[test]
fn test_init_and_show() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    loom()
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout("The cat\n");
}

#[test]
fn test_init_refuses_existing_file() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    loom()
        .arg("init")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    loom().arg("init").arg(&file).arg("--force").assert().success();
    loom().arg("show").arg(&file).assert().success().stdout("\n");
}

#[test]
fn test_edit_appends_after_generated_text() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    add(&file, " sat on the mat.", true);

    loom()
        .arg("edit")
        .arg(&file)
        .write_stdin("The cat sat on the mat. today")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("new-child structural cursor=29"));
    loom()
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout("The cat sat on the mat. today\n");

    let out = loom().arg("nodes").arg(&file).arg("--json").output().unwrap();
    let nodes: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(nodes.as_array().unwrap().len(), 3);
}

#[test]
fn test_edit_with_diff() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    loom()
        .arg("edit")
        .arg(&file)
        .arg("--diff")
        .write_stdin("The dog")
        .assert()
        .success()
        .stdout(predicate::str::contains("--- before"))
        .stdout(predicate::str::contains("+The dog"));
}

#[test]
fn test_unchanged_edit_is_noop() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    loom()
        .arg("edit")
        .arg(&file)
        .write_stdin("The cat")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("noop none"));
}

#[test]
fn test_select_switches_branch() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    let root_out = loom().arg("nodes").arg(&file).arg("--json").output().unwrap();
    let nodes: serde_json::Value = serde_json::from_slice(&root_out.stdout).unwrap();
    let root = nodes[0]["id"].as_str().unwrap().to_string();

    let sat = add(&file, " sat.", true);
    loom()
        .arg("add")
        .arg(&file)
        .args(["--parent", &root, "--text", " ran.", "--ai"])
        .assert()
        .success();
    loom().arg("show").arg(&file).assert().stdout("The cat ran.\n");

    loom()
        .arg("select")
        .arg(&file)
        .args(["--node", &sat])
        .assert()
        .success();
    loom().arg("show").arg(&file).assert().stdout("The cat sat.\n");
    loom()
        .arg("nodes")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("* {sat} ai")));
}

#[test]
fn test_select_unknown_node_fails() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    loom()
        .arg("select")
        .arg(&file)
        .args(["--node", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_show_segments_and_json() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    add(&file, " sat.", true);
    loom()
        .arg("show")
        .arg(&file)
        .arg("--segments")
        .assert()
        .success()
        .stdout(predicate::str::contains("7..12").and(predicate::str::contains("\" sat.\"")));

    let out = loom().arg("show").arg(&file).arg("--json").output().unwrap();
    let view: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(view["text"], "The cat sat.");
    assert_eq!(view["segments"].as_array().unwrap().len(), 2);
    assert_eq!(view["segments"][1]["kind"], "ai");
}

#[test]
fn test_split_and_merge() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    let sat = add(&file, " sat on the mat.", true);
    let out = loom()
        .arg("split")
        .arg(&file)
        .args(["--node", &sat, "--offset", "4"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let tail = String::from_utf8(out.stdout).unwrap().trim().to_string();

    loom()
        .arg("show")
        .arg(&file)
        .arg("--segments")
        .assert()
        .stdout(predicate::str::contains("\" on the mat.\""));
    loom()
        .arg("merge")
        .arg(&file)
        .args(["--node", &tail])
        .assert()
        .success();
    loom()
        .arg("show")
        .arg(&file)
        .assert()
        .stdout("The cat sat on the mat.\n");
}

#[test]
fn test_delete_subtree() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    let sat = add(&file, " sat.", true);
    loom()
        .arg("delete")
        .arg(&file)
        .args(["--node", &sat])
        .assert()
        .success()
        .stdout(predicate::str::contains(sat.as_str()));
    loom().arg("show").arg(&file).assert().stdout("The cat\n");
}

#[test]
fn test_validate() {
    let dir = TempDir::new().unwrap();
    let file = init(dir.path(), "The cat");
    loom()
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid (1 nodes)"));

    let broken = dir.path().join("broken.json");
    std::fs::write(
        &broken,
        r#"{"nodes": {"r": {"text": "x"}, "a": {"text": "y", "parentIds": ["ghost"]}}}"#,
    )
    .unwrap();
    loom()
        .arg("validate")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown parent ghost"))
        .stderr(predicate::str::contains("needs repair"));
}

#[test]
fn test_malformed_document_is_rejected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("doc.json");
    std::fs::write(&file, r#"{"nodes": []}"#).unwrap();
    loom()
        .arg("edit")
        .arg(&file)
        .write_stdin("anything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse document"));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), r#"{"nodes": []}"#);
}
