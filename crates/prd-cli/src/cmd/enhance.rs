use super::{open_project, RunFlags};
use crate::output::print_json;
use crate::provider;
use anyhow::Context;
use prd_core::engine::{Engine, FileDocument};
use prd_core::state::FileStateStore;
use std::path::Path;

pub fn run(root: &Path, flags: RunFlags, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let mut project = open_project(root, !flags.dry_run)?;

    let mut provider = provider::from_config(&project.config, root, flags.stub);
    let mut store = FileStateStore::new(&project.state_path);
    let mut sink = FileDocument::new(&project.document);
    tracing::info!(
        command = "enhance",
        provider = provider.name(),
        limit = ?limit,
        "starting"
    );

    let stats = Engine::new(
        flags.engine_config(&project.config),
        provider.as_mut(),
        &mut store,
    )
    .with_sink(&mut sink)
    .run_pass(&mut project.state, &mut project.lines, limit)
    .context("enhancement pass aborted")?;

    if json {
        print_json(&serde_json::json!({
            "dry_run": flags.dry_run,
            "stats": stats,
        }))?;
    } else if flags.dry_run {
        println!("Dry run: {} chunk(s) would be enhanced", stats.attempted);
    } else {
        println!(
            "Pass complete: {} attempted, {} succeeded, {} failed",
            stats.attempted, stats.succeeded, stats.failed
        );
        println!("Lines: {} -> {}", stats.lines_before, stats.lines_after);
        if stats.stopped_early {
            println!(
                "Stopped early after {} consecutive failures",
                stats.consecutive_failures
            );
        }
    }

    if stats.failed > 0 {
        anyhow::bail!(
            "{} chunk(s) failed; see 'prd status' for details",
            stats.failed
        );
    }
    Ok(())
}
