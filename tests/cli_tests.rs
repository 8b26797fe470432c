//! CLI interface tests

use assert_cmd::Command;
use git2::{IndexAddOption, Repository, Signature};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn graftset(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("graftset").unwrap();
    cmd.env("HOME", home)
        .env_remove("GRAFTSET_SOURCE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// Commit `files` into a fresh repository under `dir`
fn git_fixture(dir: &Path, files: &[(&str, &str)]) {
    let repo = Repository::init(dir).unwrap();
    for (path, content) in files {
        let full = dir.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("graftset", "graftset@example.com").unwrap();
    repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
        .unwrap();
}

fn write_config(dir: &Path, repo: &Path) -> std::path::PathBuf {
    let config = format!(
        r#"
sources:
  - alias: base
    sourceType: git
    url: "file://{}"
    path: /template
  - alias: notes
    sourceType: file
    path: /
sourceSets:
  - alias: service
    sources: [base]
    values:
      Owner: platform
"#,
        repo.display()
    );
    let path = dir.join("sources.yaml");
    fs::write(&path, config).unwrap();
    path
}

fn fixture() -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    git_fixture(
        &repo,
        &[
            ("template/README.md.template", "# {{ .Name }} by {{ .Owner }}\n"),
            ("template/src/main.rs", "fn main() {}\n"),
            ("other/ignored.txt", "ignored\n"),
        ],
    );
    let config = write_config(temp.path(), &repo);
    (temp, config)
}

#[test]
fn test_help_flag() {
    let temp = TempDir::new().unwrap();
    graftset(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scaffold projects"));
}

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    graftset(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("graftset"));
}

#[test]
fn test_missing_config_error() {
    let temp = TempDir::new().unwrap();
    graftset(temp.path())
        .args(["values", "--source-set", "service", "-s"])
        .arg(temp.path().join("nonexistent.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Source configuration not found"));
}

#[test]
fn test_default_config_is_read_from_home() {
    let temp = TempDir::new().unwrap();
    graftset(temp.path())
        .args(["values", "--source-set", "service"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(".graftset"));
}

#[test]
fn test_selection_is_required() {
    let temp = TempDir::new().unwrap();
    graftset(temp.path())
        .args(["project", "-o"])
        .arg(temp.path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_unknown_source_set() {
    let (temp, config) = fixture();
    graftset(temp.path())
        .args(["values", "--source-set", "nope", "-s"])
        .arg(&config)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("source set not found: nope"));
}

#[test]
fn test_values_prints_yaml_skeleton() {
    let (temp, config) = fixture();
    graftset(temp.path())
        .args(["values", "--source-set", "service", "-s"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: ''"))
        .stdout(predicate::str::contains("Owner: platform"));
}

#[test]
fn test_config_from_environment() {
    let (temp, config) = fixture();
    graftset(temp.path())
        .env("GRAFTSET_SOURCE_CONFIG", &config)
        .args(["values", "--sources", "base"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Owner: ''"));
}

#[test]
fn test_file_source_is_a_fetch_error() {
    let (temp, config) = fixture();
    graftset(temp.path())
        .args(["values", "--sources", "notes", "-s"])
        .arg(&config)
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("not implemented"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let (temp, config) = fixture();
    let out = temp.path().join("out");
    graftset(temp.path())
        .args(["project", "--dry-run", "--source-set", "service", "-p", "demo", "-s"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Dry run preview"));
    assert!(!out.exists());
}

#[test]
fn test_project_with_values_file() {
    let (temp, config) = fixture();
    let out = temp.path().join("out");
    let values = temp.path().join("values.yaml");
    fs::write(&values, "Name: demo\nOwner: core\n").unwrap();

    graftset(temp.path())
        .args(["project", "--source-set", "service", "-p", "demo", "--fail-on-missing", "-s"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .arg("-f")
        .arg(&values)
        .assert()
        .success();

    let root = out.join("demo");
    assert_eq!(
        fs::read_to_string(root.join("README.md")).unwrap(),
        "# demo by core\n"
    );
    assert!(root.join("src/main.rs").is_file());
    assert!(!root.join("README.md.template").exists());
    assert!(!root.join("other").exists());
}

#[test]
fn test_project_missing_value_exit_code() {
    let (temp, config) = fixture();
    let out = temp.path().join("out");
    let values = temp.path().join("values.yaml");
    fs::write(&values, "Name: demo\n").unwrap();

    graftset(temp.path())
        .args(["project", "--sources", "base", "--append-name=false", "--fail-on-missing", "-s"])
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .arg("-f")
        .arg(&values)
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Owner"));

    assert!(out.join("README.md.template").is_file());
}
