//! End-to-end tests for the `gloss` binary.
//!
//! Only paths that never reach an LLM are exercised here: config errors,
//! status, listing, dry runs, and the missing API key check.

mod common;

use common::{git_available, make_origin, Project};
use std::path::{Path, PathBuf};
use std::process::Command;

fn gloss_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("gloss");
    path
}

fn run_gloss(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = gloss_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run gloss binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn missing_config_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_gloss(&tmp.path().join("absent.toml"), &["status"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "{}", stderr);
}

#[test]
fn invalid_config_fails() {
    let project = Project::new("[run]\nworkers = 0");
    let (_, stderr, success) = run_gloss(&project.config_path(), &["status"]);
    assert!(!success);
    assert!(stderr.contains("workers"), "{}", stderr);
}

#[test]
fn status_without_clone() {
    let project = Project::new("");
    std::fs::remove_dir_all(project.workdir()).unwrap();

    let (stdout, _, success) = run_gloss(&project.config_path(), &["status"]);
    assert!(success);
    assert!(stdout.contains("Glossary Harness Status"));
    assert!(stdout.contains("not cloned"));
    assert!(stdout.contains("Checkpoints: 0"));
    assert!(!project.workdir().exists());
}

#[test]
fn list_without_working_copy_fails() {
    let project = Project::new("");
    std::fs::remove_dir_all(project.workdir()).unwrap();

    let (_, stderr, success) = run_gloss(&project.config_path(), &["list"]);
    assert!(!success);
    assert!(stderr.contains("No working copy"), "{}", stderr);
}

#[test]
fn list_labels_documents() {
    let project = Project::new("ignore = [\"old/\"]");
    project.add_doc("old/legacy.md", "Legacy.");
    project.add_doc("intro.md", "Intro.");

    let (stdout, _, success) = run_gloss(&project.config_path(), &["list"]);
    assert!(success);
    assert!(stdout.contains("self     docs/glossary.rst"));
    assert!(stdout.contains("ignored  old/legacy.md"));
    assert!(stdout.contains("pending  intro.md"));
    assert!(stdout.contains("3 documents, 1 pending"));

    let (stdout, _, success) = run_gloss(&project.config_path(), &["list", "--pending"]);
    assert!(success);
    assert!(!stdout.contains("old/legacy.md"));
    assert!(stdout.contains("pending  intro.md"));
}

#[test]
fn run_without_api_key_fails() {
    let project = Project::new("[llm]\napi_key_env = \"GLOSS_TEST_KEY_THAT_IS_NEVER_SET\"");
    let (_, stderr, success) = run_gloss(
        &project.config_path(),
        &["run", "--progress", "off"],
    );
    assert!(!success);
    assert!(
        stderr.contains("GLOSS_TEST_KEY_THAT_IS_NEVER_SET"),
        "{}",
        stderr
    );
}

#[test]
fn run_rejects_zero_workers() {
    let project = Project::new("");
    let (_, stderr, success) = run_gloss(&project.config_path(), &["run", "--workers", "0"]);
    assert!(!success);
    assert!(stderr.contains("--workers"), "{}", stderr);
}

#[test]
fn dry_run_reports_without_cloning() {
    if !git_available() {
        return;
    }
    let project = Project::new("");
    std::fs::remove_dir_all(project.workdir()).unwrap();
    let url = make_origin(
        &project.root().join("origin"),
        &[
            ("docs/glossary.rst", "Terms."),
            ("docs/a.md", "A."),
            ("docs/b.rst", "B."),
        ],
    );
    project.write_config(&url, "");

    let (stdout, stderr, success) = run_gloss(
        &project.config_path(),
        &["run", "--dry-run", "--progress", "off"],
    );
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("run (dry-run)"));
    assert!(stdout.contains("documents found: 3"));
    assert!(stdout.contains("would extract: 2"));
    assert!(stdout.contains("working copy: would clone"));
    assert!(stdout.trim_end().ends_with("ok"));
    assert!(!project.workdir().exists());
    assert!(!project.root().join("checkpoints.json").exists());

    let (stdout, _, success) = run_gloss(&project.config_path(), &["status"]);
    assert!(success);
    assert!(stdout.contains("not cloned"));
}

#[test]
fn workers_above_limit_are_rejected() {
    let project = Project::new("");
    let (_, stderr, success) = run_gloss(
        &project.config_path(),
        &["run", "--workers", "100000"],
    );
    assert!(!success);
    assert!(stderr.contains("between 1 and 256"), "{}", stderr);
}
