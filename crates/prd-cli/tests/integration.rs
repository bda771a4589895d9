#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn prd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("prd").unwrap();
    cmd.current_dir(dir.path())
        .env("PRD_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    prd(dir).arg("init").assert().success();
}

/// A 40-line document split into 5-line chunks.
fn init_small_chunks(dir: &TempDir) {
    let body: String = (1..=40).map(|i| format!("line {i}\n")).collect();
    std::fs::write(dir.path().join("prd.md"), body).unwrap();
    prd(dir)
        .args(["init", "--chunk-size", "5"])
        .assert()
        .success();
}

fn line_count(dir: &TempDir) -> usize {
    std::fs::read_to_string(dir.path().join("prd.md"))
        .unwrap()
        .lines()
        .count()
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// prd init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_state_and_document() {
    let dir = TempDir::new().unwrap();
    prd(&dir).arg("init").assert().success();

    assert!(dir.path().join(".prd").is_dir());
    assert!(dir.path().join(".prd/config.yaml").exists());
    assert!(dir.path().join(".prd/state.json").exists());
    let doc = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();
    assert!(doc.starts_with("# "));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    prd(&dir).arg("init").assert().success();
    prd(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk map kept"));
}

#[test]
fn init_keeps_existing_document() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("prd.md"), "# Mine\n\nhand written\n").unwrap();
    init_project(&dir);

    let doc = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();
    assert_eq!(doc, "# Mine\n\nhand written\n");
}

#[test]
fn init_force_rebuilds_with_new_chunk_size() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .args(["init", "--chunk-size", "10", "--force"])
        .assert()
        .success();

    let v = json_output(prd(&dir).args(["status", "--json"]));
    assert_eq!(v["chunk_size"], 10);
    assert_eq!(v["counts"]["pending"], 4);
}

#[test]
fn init_rejects_zero_chunk_size() {
    let dir = TempDir::new().unwrap();
    prd(&dir)
        .args(["init", "--chunk-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size_lines"));
}

// ---------------------------------------------------------------------------
// prd status
// ---------------------------------------------------------------------------

#[test]
fn status_reports_pending_chunks() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lines:    40"))
        .stdout(predicate::str::contains("pending  8"));
}

#[test]
fn status_json_has_counts() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let v = json_output(prd(&dir).args(["status", "--json"]));
    assert_eq!(v["total_lines"], 40);
    assert_eq!(v["counts"]["pending"], 8);
    assert_eq!(v["counts"]["done"], 0);
    assert_eq!(v["stale"], false);
    assert!(v.get("chunks").is_none());
}

#[test]
fn status_verbose_lists_chunks() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .args(["status", "-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains("P1.0008"));
}

#[test]
fn status_without_init_fails() {
    let dir = TempDir::new().unwrap();
    prd(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("prd init"));
}

// ---------------------------------------------------------------------------
// prd enhance
// ---------------------------------------------------------------------------

#[test]
fn enhance_with_stub_grows_document() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .args(["enhance", "--stub", "--limit", "3"])
        .assert()
        .success();

    // Stub prepends one line per chunk.
    assert_eq!(line_count(&dir), 43);
    let doc = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();
    assert!(doc.contains("[LOCAL-STUB] Phase P1.0001"));

    let v = json_output(prd(&dir).args(["status", "--json"]));
    assert_eq!(v["counts"]["done"], 3);
    assert_eq!(v["counts"]["pending"], 5);
    assert_eq!(v["total_lines"], 43);
}

#[test]
fn enhance_dry_run_leaves_document_alone() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let before = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();
    let state_before = std::fs::read_to_string(dir.path().join(".prd/state.json")).unwrap();

    prd(&dir)
        .args(["enhance", "--stub", "--dry-run"])
        .assert()
        .success();

    let after = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();
    let state_after = std::fs::read_to_string(dir.path().join(".prd/state.json")).unwrap();
    assert_eq!(before, after);
    assert_eq!(state_before, state_after);
}

#[test]
fn enhance_rebuilds_after_outside_edit() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let mut doc = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();
    doc.push_str("added by hand\n");
    std::fs::write(dir.path().join("prd.md"), doc).unwrap();

    prd(&dir)
        .args(["enhance", "--stub", "--limit", "1"])
        .assert()
        .success();

    let v = json_output(prd(&dir).args(["status", "--json"]));
    assert_eq!(v["counts"]["done"], 1);
    assert_eq!(v["counts"]["pending"], 8);
    assert_eq!(v["total_lines"], 42);
}

#[test]
fn enhance_without_init_fails() {
    let dir = TempDir::new().unwrap();
    prd(&dir).args(["enhance", "--stub"]).assert().failure();
}

#[test]
fn enhance_json_reports_pass_stats() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let v = json_output(prd(&dir).args(["enhance", "--stub", "--json"]));
    assert_eq!(v["dry_run"], false);
    assert_eq!(v["stats"]["attempted"], 8);
    assert_eq!(v["stats"]["succeeded"], 8);
    assert_eq!(v["stats"]["lines_before"], 40);
    assert_eq!(v["stats"]["lines_after"], 48);
}

// ---------------------------------------------------------------------------
// prd grow
// ---------------------------------------------------------------------------

#[test]
fn grow_reaches_target() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let v = json_output(prd(&dir).args([
        "grow",
        "--stub",
        "--target",
        "100",
        "--max-passes",
        "20",
        "--json",
    ]));
    assert_eq!(v["stop"], "target_reached");
    assert_eq!(v["aborted"], false);
    assert!(v["final_lines"].as_u64().unwrap() >= 95);
    assert_eq!(line_count(&dir) as u64, v["final_lines"].as_u64().unwrap());
}

#[test]
fn grow_stops_at_max_passes() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let v = json_output(prd(&dir).args([
        "grow",
        "--stub",
        "--target",
        "100000",
        "--max-passes",
        "2",
        "--json",
    ]));
    assert_eq!(v["stop"], "max_passes");
    assert_eq!(v["passes_completed"], 2);
}

#[test]
fn grow_rejects_zero_target() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .args(["grow", "--stub", "--target", "0"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// prd retry / reset
// ---------------------------------------------------------------------------

#[test]
fn retry_unknown_chunk_fails() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .args(["retry", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("99"));
}

#[test]
fn retry_done_chunk_marks_it_pending() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir)
        .args(["enhance", "--stub", "--limit", "1"])
        .assert()
        .success();
    prd(&dir).args(["retry", "1"]).assert().success();

    let v = json_output(prd(&dir).args(["status", "--json"]));
    assert_eq!(v["counts"]["done"], 0);
    assert_eq!(v["counts"]["pending"], 8);
}

#[test]
fn retry_needs_ids_or_failed_flag() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    prd(&dir).arg("retry").assert().failure();
    prd(&dir)
        .args(["retry", "--failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No failed chunks"));
}

#[test]
fn reset_backs_up_state() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    prd(&dir).arg("reset").assert().success();

    assert!(!dir.path().join(".prd/state.json").exists());
    let backups: Vec<_> = std::fs::read_dir(dir.path().join(".prd"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("state.json.bak.")
        })
        .collect();
    assert_eq!(backups.len(), 1);
}

#[test]
fn reset_without_state_is_noop() {
    let dir = TempDir::new().unwrap();
    prd(&dir)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("No state file"));
}

// ---------------------------------------------------------------------------
// prd doctor / config
// ---------------------------------------------------------------------------

#[test]
fn doctor_ok_after_init() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    prd(&dir)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found"));
}

#[test]
fn doctor_fix_rebuilds_stale_map() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    std::fs::write(dir.path().join("prd.md"), "short\n").unwrap();

    prd(&dir).args(["doctor", "--fix"]).assert().success();

    let v = json_output(prd(&dir).args(["status", "--json"]));
    assert_eq!(v["total_lines"], 1);
    assert_eq!(v["stale"], false);
}

#[test]
fn doctor_never_replaces_corrupt_state() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let config = dir.path().join(".prd/config.yaml");
    let yaml = std::fs::read_to_string(&config).unwrap();
    assert!(yaml.contains("doctor_auto_fix: false"));
    std::fs::write(&config, yaml.replace("doctor_auto_fix: false", "doctor_auto_fix: true")).unwrap();

    let state_path = dir.path().join(".prd/state.json");
    let full = std::fs::read_to_string(&state_path).unwrap();
    let truncated = &full[..full.len() / 2];
    std::fs::write(&state_path, truncated).unwrap();

    for args in [vec!["doctor"], vec!["doctor", "--fix"]] {
        prd(&dir)
            .args(&args)
            .assert()
            .failure()
            .stdout(predicate::str::contains("prd reset"))
            .stdout(predicate::str::contains("fixed:").not());
        assert_eq!(std::fs::read_to_string(&state_path).unwrap(), truncated);
    }

    prd(&dir).arg("reset").assert().success();
    let backups = std::fs::read_dir(dir.path().join(".prd"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("state.json.bak."))
        .count();
    assert_eq!(backups, 1);
}

#[test]
fn enhance_rejects_overlapping_chunk_map() {
    let dir = TempDir::new().unwrap();
    init_small_chunks(&dir);
    let state_path = dir.path().join(".prd/state.json");
    let mut state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    state["chunks"][1]["start_line"] = serde_json::json!(3);
    std::fs::write(&state_path, serde_json::to_string_pretty(&state).unwrap()).unwrap();
    let before = std::fs::read_to_string(dir.path().join("prd.md")).unwrap();

    prd(&dir)
        .args(["enhance", "--stub"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));
    assert_eq!(std::fs::read_to_string(dir.path().join("prd.md")).unwrap(), before);
}

#[test]
fn doctor_errors_without_document() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::remove_file(dir.path().join("prd.md")).unwrap();
    prd(&dir).arg("doctor").assert().failure();
}

#[test]
fn config_validate_defaults_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    prd(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn config_validate_flags_low_ratio() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let path = dir.path().join(".prd/config.yaml");
    let yaml = std::fs::read_to_string(&path).unwrap();
    let yaml = yaml.replace("min_length_ratio: 0.9", "min_length_ratio: 0.5");
    std::fs::write(&path, yaml).unwrap();

    prd(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning]"));
}

#[test]
fn config_show_json() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let v = json_output(prd(&dir).args(["config", "show", "--json"]));
    assert_eq!(v["chunk_size_lines"], 120);
    assert_eq!(v["provider"]["type"], "stub");
}
