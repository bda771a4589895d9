use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PRD_DIR: &str = ".prd";
pub const CONFIG_FILE: &str = ".prd/config.yaml";
pub const STATE_FILE: &str = ".prd/state.json";
pub const LOG_FILE: &str = ".prd/prd.log";

pub const DEFAULT_DOCUMENT: &str = "prd.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn prd_dir(root: &Path) -> PathBuf {
    root.join(PRD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

/// Resolve a config-relative path against the project root.
/// Absolute paths are returned unchanged.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Backup path for a state file being reset, e.g. `state.json.bak.20260101_120000`.
pub fn state_backup_path(state: &Path, stamp: &str) -> PathBuf {
    let name = state
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state.json".to_string());
    state.with_file_name(format!("{name}.bak.{stamp}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
