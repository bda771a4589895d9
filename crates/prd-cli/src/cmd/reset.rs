use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use prd_core::paths;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let state_path = paths::state_path(root);
    if !state_path.exists() {
        if json {
            print_json(&serde_json::json!({ "reset": false, "backup": null }))?;
        } else {
            println!("No state file to reset.");
        }
        return Ok(());
    }

    let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let backup = paths::state_backup_path(&state_path, &stamp);
    std::fs::rename(&state_path, &backup)
        .with_context(|| format!("failed to move state to {}", backup.display()))?;
    tracing::info!(command = "reset", backup = %backup.display(), "state backed up and removed");

    if json {
        print_json(&serde_json::json!({
            "reset": true,
            "backup": backup.display().to_string(),
        }))?;
    } else {
        println!("State backed up to {}", backup.display());
        println!("Run 'prd init' to build a fresh chunk map.");
    }
    Ok(())
}
