//! Integration tests for the command-line interface.
//!
//! Drives the built binary against temporary project trees, covering the
//! exit-status contract: missing targets alone exit zero, failed jobs
//! exit non-zero.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn repatch() -> Command {
    Command::new(env!("CARGO_BIN_EXE_repatch"))
}

/// Project tree with one patchable file, one absent target, and a patch
/// set covering both.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::create_dir_all(dir.path().join("internal/model")).unwrap();
    fs::write(
        dir.path().join("internal/model/user.go"),
        "type User struct {}\n\tID: uuid.New()\n",
    )
    .unwrap();

    let patches = dir.path().join("patches");
    fs::create_dir(&patches).unwrap();
    fs::write(
        patches.join("uuid.toml"),
        r#"[meta]
name = "fix-uuid-stringify"
root_relative = true

[[jobs]]
file = "internal/model/user.go"

[[jobs.rules]]
name = "uuid-stringify"
replace = "${1}.String()"

[jobs.rules.matcher]
type = "regex"
pattern = '(?m)^(\s*ID:\s*uuid\.New\(\))$'

[[jobs]]
file = "internal/service/user.go"

[[jobs.rules]]
name = "uuid-stringify"
replace = "${1}.String()"

[jobs.rules.matcher]
type = "regex"
pattern = '(?m)^(\s*ID:\s*uuid\.New\(\))$'
"#,
    )
    .unwrap();

    dir
}

fn run_apply(project: &Path, extra: &[&str]) -> std::process::Output {
    repatch()
        .arg("apply")
        .arg(project.join("patches"))
        .arg("--root")
        .arg(project)
        .args(extra)
        .output()
        .unwrap()
}

#[test]
fn apply_help() {
    let output = repatch().args(["apply", "--help"]).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply patch sets"));
}

#[test]
fn apply_patches_a_project_tree() {
    let project = setup_project();

    let output = run_apply(project.path(), &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    // Missing optional target must not fail the batch
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Changed"));
    assert!(stdout.contains("Not found"));
    assert!(stdout.contains("Summary:"));

    let patched = fs::read_to_string(project.path().join("internal/model/user.go")).unwrap();
    assert!(patched.contains("ID: uuid.New().String()"));
}

#[test]
fn second_apply_is_a_no_op() {
    let project = setup_project();

    assert!(run_apply(project.path(), &[]).status.success());

    let output = run_apply(project.path(), &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Unchanged"));
    assert!(!stdout.contains("Changed ("), "no rewrite on second run");
}

#[test]
fn failed_job_exits_nonzero() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("a.txt"), "value").unwrap();
    let patchset = project.path().join("grow.toml");
    fs::write(
        &patchset,
        r#"[meta]
name = "self-triggering"
root_relative = true

[[jobs]]
file = "a.txt"

[[jobs.rules]]
name = "grow"
replace = "value+"

[jobs.rules.matcher]
type = "literal"
search = "value"
"#,
    )
    .unwrap();

    let output = repatch()
        .arg("apply")
        .arg(&patchset)
        .arg("--root")
        .arg(project.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("re-triggers"));
    // Rejected before writing
    assert_eq!(
        fs::read_to_string(project.path().join("a.txt")).unwrap(),
        "value"
    );
}

#[test]
fn dry_run_leaves_targets_untouched() {
    let project = setup_project();

    let output = run_apply(project.path(), &["--dry-run"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("Would change"));

    let content = fs::read_to_string(project.path().join("internal/model/user.go")).unwrap();
    assert!(content.contains("ID: uuid.New()\n"), "file not modified");
}

#[test]
fn dry_run_with_diff_previews_changes() {
    let project = setup_project();

    let output = run_apply(project.path(), &["--dry-run", "--diff"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("(patched)"), "diff header shown: {stdout}");
    assert!(stdout.contains("uuid.New().String()"), "would-be content shown");

    let content = fs::read_to_string(project.path().join("internal/model/user.go")).unwrap();
    assert!(content.contains("ID: uuid.New()\n"), "file not modified");
}

#[test]
fn check_is_read_only() {
    let project = setup_project();

    let output = repatch()
        .arg("check")
        .arg(project.path().join("patches"))
        .arg("--root")
        .arg(project.path())
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Patch status report"));
    assert!(stdout.contains("Would change"));

    let content = fs::read_to_string(project.path().join("internal/model/user.go")).unwrap();
    assert!(content.contains("ID: uuid.New()\n"));
}

#[test]
fn list_shows_jobs_and_rules() {
    let project = setup_project();

    let output = repatch()
        .arg("list")
        .arg(project.path().join("patches"))
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("fix-uuid-stringify"));
    assert!(stdout.contains("internal/model/user.go"));
    assert!(stdout.contains("uuid-stringify (regex)"));
}

#[test]
fn missing_patch_set_fails() {
    let output = repatch()
        .args(["apply", "/nonexistent/patches.toml"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}
