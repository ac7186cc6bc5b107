use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cmk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cmk");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Create a small workspace with markers in three files
    let repo = root.join("repo");
    fs::create_dir_all(&repo).unwrap();
    fs::write(
        repo.join("a.ts"),
        "// TODO: fix X\nlet x = 1;\n// @audit check bounds\n",
    )
    .unwrap();
    fs::write(repo.join("b.rs"), "// FIXME later\n").unwrap();
    fs::write(repo.join("skip.min.js"), "// TODO: minified\n").unwrap();

    let config_content = format!(
        r#"[project]
name = "demo"
root = "{}/repo"

[markers]
ignored_extensions = [".min.js"]

[markers.categories]
audit = ["@audit"]
todo = ["TODO", "FIXME"]

[search]
include_globs = ["**/*.ts", "**/*.js", "**/*.rs"]
max_files = 100
"#,
        root.display()
    );

    let config_path = root.join("codemarks.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cmk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cmk_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cmk binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn export_payload(config_path: &Path) -> serde_json::Value {
    let (stdout, stderr, success) = run_cmk(config_path, &["export"]);
    assert!(success, "export failed: stderr={}", stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("export is not JSON: {}: {}", e, stdout))
}

#[test]
fn test_scan_reports_found_annotations() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cmk(&config_path, &["scan", "--progress", "off"]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("Scanned 3 files, found 3 annotations."),
        "Unexpected scan summary: {}",
        stdout
    );
}

#[test]
fn test_scan_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout1, _, _) = run_cmk(&config_path, &["scan", "--progress", "off"]);
    let (stdout2, _, _) = run_cmk(&config_path, &["scan", "--progress", "off"]);
    assert_eq!(stdout1, stdout2, "Rescanning an unchanged tree should report the same summary");
}

#[test]
fn test_scan_writes_the_index_snapshot() {
    let (tmp, config_path) = setup_test_env();

    run_cmk(&config_path, &["scan", "--progress", "off"]);

    let snapshot = tmp.path().join("repo").join(".codemarks").join("index.json");
    assert!(snapshot.exists(), "snapshot should exist after scan");

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot).unwrap()).unwrap();
    let files = parsed["files"].as_object().unwrap();
    assert_eq!(files.len(), 2, "only eligible files are indexed: {:?}", files.keys());
}

#[test]
fn test_export_payload_shape() {
    let (tmp, config_path) = setup_test_env();

    let payload = export_payload(&config_path);
    assert_eq!(payload["project"], "demo");

    let bookmarks = payload["bookmarks"].as_array().unwrap();
    assert_eq!(bookmarks.len(), 3, "payload: {}", payload);

    // Files in sorted order; categories in name order within a file.
    let kinds: Vec<&str> = bookmarks.iter().map(|b| b["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["audit", "todo", "todo"]);

    let texts: Vec<&str> = bookmarks.iter().map(|b| b["text"].as_str().unwrap()).collect();
    assert_eq!(
        texts,
        vec!["// @audit check bounds", "// TODO: fix X", "// FIXME later"]
    );

    let a_ts = tmp.path().join("repo").join("a.ts");
    assert_eq!(
        bookmarks[0]["deeplink"],
        format!("windsurf://file/{}:3", a_ts.display()),
        "deeplinks are one-based"
    );
    assert_eq!(
        bookmarks[1]["deeplink"],
        format!("windsurf://file/{}:1", a_ts.display())
    );
}

#[test]
fn test_export_is_repeatable_without_state_changes() {
    let (_tmp, config_path) = setup_test_env();

    let first = export_payload(&config_path);
    let second = export_payload(&config_path);
    assert_eq!(first, second, "export must not consume annotations");
}

#[test]
fn test_process_marks_everything() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cmk(&config_path, &["process"]);
    assert!(success, "process failed: stderr={}", stderr);
    assert!(
        stdout.contains("Processed 3 annotations across 2 files."),
        "Unexpected process summary: {}",
        stdout
    );

    let payload = export_payload(&config_path);
    assert_eq!(
        payload["bookmarks"].as_array().unwrap().len(),
        0,
        "everything was processed"
    );
}

#[test]
fn test_toggle_by_full_id_and_prefix() {
    let (tmp, config_path) = setup_test_env();

    run_cmk(&config_path, &["scan", "--progress", "off"]);

    let file_key = tmp.path().join("repo").join("a.ts").display().to_string();
    let id = codemarks::identity::annotation_id(&file_key, "todo", 0, "// TODO: fix X");

    let (stdout, stderr, success) = run_cmk(&config_path, &["toggle", &id]);
    assert!(success, "toggle failed: stderr={}", stderr);
    assert!(stdout.contains("-> processed"), "got: {}", stdout);

    let payload = export_payload(&config_path);
    let texts: Vec<&str> = payload["bookmarks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["text"].as_str().unwrap())
        .collect();
    assert!(!texts.contains(&"// TODO: fix X"), "toggled annotation still exported: {:?}", texts);
    assert_eq!(texts.len(), 2);

    // A unique prefix works too, flipping it back.
    let (stdout, _, success) = run_cmk(&config_path, &["toggle", &id[..16]]);
    assert!(success);
    assert!(stdout.contains("-> unprocessed"), "got: {}", stdout);
}

#[test]
fn test_toggle_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_cmk(&config_path, &["scan", "--progress", "off"]);
    let (_, stderr, success) = run_cmk(&config_path, &["toggle", "zzzz"]);
    assert!(!success, "unknown id should fail");
    assert!(stderr.contains("no indexed annotation"), "got: {}", stderr);
}

#[test]
fn test_list_shows_processed_markers() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, _) = run_cmk(&config_path, &["list"]);
    assert!(
        stdout.contains("No annotations indexed"),
        "list before scan should say so, got: {}",
        stdout
    );

    run_cmk(&config_path, &["scan", "--progress", "off"]);

    let (stdout, _, success) = run_cmk(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("[ ]"), "got: {}", stdout);
    assert!(stdout.contains("// TODO: fix X"), "got: {}", stdout);
    assert!(stdout.contains("todo:1"), "rows show category and one-based line: {}", stdout);

    let file_key = tmp.path().join("repo").join("a.ts").display().to_string();
    let id = codemarks::identity::annotation_id(&file_key, "todo", 0, "// TODO: fix X");
    run_cmk(&config_path, &["toggle", &id]);

    let (stdout, _, _) = run_cmk(&config_path, &["list"]);
    assert!(stdout.contains("[x]"), "got: {}", stdout);

    let (stdout, _, _) = run_cmk(&config_path, &["list", "--unprocessed"]);
    assert!(!stdout.contains("// TODO: fix X"), "got: {}", stdout);
    assert!(stdout.contains("// FIXME later"), "got: {}", stdout);
}

#[test]
fn test_reset_clears_snapshot_but_keeps_ledger() {
    let (tmp, config_path) = setup_test_env();

    run_cmk(&config_path, &["process"]);

    let state_dir = tmp.path().join("repo").join(".codemarks");
    assert!(state_dir.join("index.json").exists());
    assert!(state_dir.join("state.json").exists());

    let (stdout, _, success) = run_cmk(&config_path, &["reset"]);
    assert!(success);
    assert!(stdout.contains("Index snapshot cleared."), "got: {}", stdout);
    assert!(!state_dir.join("index.json").exists());
    assert!(state_dir.join("state.json").exists(), "reset must keep the ledger");

    // Rescanning restores the index and everything is still processed.
    run_cmk(&config_path, &["scan", "--progress", "off"]);
    let payload = export_payload(&config_path);
    assert_eq!(payload["bookmarks"].as_array().unwrap().len(), 0);
}

#[test]
fn test_sync_fails_closed_without_configuration() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cmk(&config_path, &["sync"]);
    assert!(!success, "sync with the shipped endpoint must fail");
    assert!(stderr.contains("sync.endpoint"), "got: {}", stderr);

    // Failing closed means it aborted before any scan or ledger I/O.
    let state_dir = tmp.path().join("repo").join(".codemarks");
    assert!(!state_dir.join("state.json").exists(), "sync must not touch state");
}

#[test]
fn test_unreadable_file_is_skipped_not_fatal() {
    let (tmp, config_path) = setup_test_env();

    // Not valid UTF-8, so reading it as text fails.
    fs::write(tmp.path().join("repo").join("bad.ts"), [0xffu8, 0xfe, 0x00]).unwrap();

    let (stdout, stderr, success) = run_cmk(&config_path, &["scan", "--progress", "off"]);
    assert!(success, "a skipped file must not fail the scan: {}", stderr);
    assert!(
        stdout.contains("Scanned 3 of 4 files (1 skipped), found 3 annotations."),
        "Unexpected scan summary: {}",
        stdout
    );
    assert!(stderr.contains("failed to read"), "got: {}", stderr);
}

#[test]
fn test_corrupt_ledger_degrades_to_empty() {
    let (tmp, config_path) = setup_test_env();

    let state_dir = tmp.path().join("repo").join(".codemarks");
    fs::create_dir_all(&state_dir).unwrap();
    fs::write(state_dir.join("state.json"), "{not json").unwrap();

    let payload = export_payload(&config_path);
    assert_eq!(
        payload["bookmarks"].as_array().unwrap().len(),
        3,
        "a corrupt ledger means nothing is processed"
    );
}

#[test]
fn test_processed_state_survives_edits_elsewhere() {
    let (tmp, config_path) = setup_test_env();
    let repo = tmp.path().join("repo");

    run_cmk(&config_path, &["process"]);

    // A new marker shows up unprocessed; old ones stay processed.
    fs::write(repo.join("b.rs"), "// FIXME later\n// TODO: new thing\n").unwrap();
    let payload = export_payload(&config_path);
    let texts: Vec<&str> = payload["bookmarks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["// TODO: new thing"]);

    // Editing a processed line changes its identity, so it comes back.
    fs::write(
        repo.join("a.ts"),
        "// TODO: fix X properly\nlet x = 1;\n// @audit check bounds\n",
    )
    .unwrap();
    let payload = export_payload(&config_path);
    let texts: Vec<&str> = payload["bookmarks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["// TODO: fix X properly", "// TODO: new thing"]);
}

#[test]
fn test_invalid_progress_mode_is_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cmk(&config_path, &["scan", "--progress", "loud"]);
    assert!(!success, "Unknown progress mode should fail");
    assert!(
        stderr.contains("invalid value 'loud'"),
        "Should mention the invalid value, got: {}",
        stderr
    );
    assert!(
        stderr.contains("possible values"),
        "Should list the valid modes, got: {}",
        stderr
    );
}

#[test]
fn test_list_does_not_create_state_files() {
    let (tmp, config_path) = setup_test_env();
    let state_dir = tmp.path().join("repo").join(".codemarks");

    // Before any scan there is nothing to list and nothing to create.
    let (stdout, _, success) = run_cmk(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No annotations indexed"), "got: {}", stdout);
    assert!(!state_dir.exists(), "list must not create the state directory");

    run_cmk(&config_path, &["scan", "--progress", "off"]);
    let (_, _, success) = run_cmk(&config_path, &["list"]);
    assert!(success);
    assert!(state_dir.join("index.json").exists());
    assert!(
        !state_dir.join("state.json").exists(),
        "list must not create the ledger"
    );
}

#[cfg(unix)]
#[test]
fn test_enumeration_failure_fails_the_scan_command() {
    use std::os::unix::fs::PermissionsExt;

    let (tmp, config_path) = setup_test_env();
    let locked = tmp.path().join("repo").join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    // Root ignores directory permissions; nothing to exercise then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (_, stderr, success) = run_cmk(&config_path, &["scan", "--progress", "off"]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(!success, "an unreadable directory must fail the scan");
    assert!(stderr.contains("scan failed"), "got: {}", stderr);
    assert!(
        !tmp.path().join("repo").join(".codemarks").join("index.json").exists(),
        "a failed scan must not write a snapshot"
    );
}

#[test]
fn test_missing_config_errors() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_cmk(&missing, &["scan", "--progress", "off"]);
    assert!(!success, "missing config should fail");
    assert!(
        stderr.contains("Failed to read config file"),
        "got: {}",
        stderr
    );
}
