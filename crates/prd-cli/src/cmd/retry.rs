use crate::output::print_json;
use anyhow::Context;
use prd_core::{paths, state::State};
use std::path::Path;

pub fn run(root: &Path, ids: &[u32], all_failed: bool, json: bool) -> anyhow::Result<()> {
    if ids.is_empty() && !all_failed {
        anyhow::bail!("give chunk ids or --failed");
    }

    let state_path = paths::state_path(root);
    let mut state = State::load(&state_path).context("failed to load state")?;

    let mut targets: Vec<u32> = ids.to_vec();
    if all_failed {
        targets.extend(state.failed().map(|c| c.id));
    }
    targets.sort_unstable();
    targets.dedup();

    state.retry(&targets)?;
    state.save(&state_path).context("failed to save state")?;
    tracing::info!(command = "retry", chunks = ?targets, "chunks reset to pending");

    if json {
        print_json(&serde_json::json!({ "retried": targets }))?;
    } else if targets.is_empty() {
        println!("No failed chunks.");
    } else {
        let list: Vec<String> = targets.iter().map(u32::to_string).collect();
        println!("Marked pending: {}", list.join(", "));
    }
    Ok(())
}
