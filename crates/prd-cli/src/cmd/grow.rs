use super::{open_project, RunFlags};
use crate::output::print_json;
use crate::provider;
use prd_core::engine::{Engine, FileDocument};
use prd_core::growth::{GrowthLoop, StopReason};
use prd_core::state::FileStateStore;
use std::path::Path;

/// Command-line overrides for the `growth` config section.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowOverrides {
    pub target: Option<usize>,
    pub max_passes: Option<u32>,
    pub chunks_per_pass: Option<usize>,
    pub no_rebuild: bool,
}

pub fn run(
    root: &Path,
    flags: RunFlags,
    overrides: GrowOverrides,
    json: bool,
) -> anyhow::Result<()> {
    let mut project = open_project(root, !flags.dry_run)?;

    let mut settings = project.config.growth.clone();
    if let Some(target) = overrides.target {
        settings.target_line_count = target;
    }
    if let Some(max) = overrides.max_passes {
        settings.max_passes = max;
    }
    if let Some(n) = overrides.chunks_per_pass {
        settings.max_chunks_per_pass = n;
    }
    if overrides.no_rebuild {
        settings.rebuild_each_pass = false;
    }
    if settings.target_line_count == 0
        || settings.max_passes == 0
        || settings.max_chunks_per_pass == 0
    {
        anyhow::bail!("target, max passes and chunks per pass must all be greater than 0");
    }

    let mut provider = provider::from_config(&project.config, root, flags.stub);
    let mut store = FileStateStore::new(&project.state_path);
    let mut sink = FileDocument::new(&project.document);
    tracing::info!(
        command = "grow",
        provider = provider.name(),
        target = settings.target_line_count,
        max_passes = settings.max_passes,
        "starting"
    );

    let engine = Engine::new(
        flags.engine_config(&project.config),
        provider.as_mut(),
        &mut store,
    )
    .with_sink(&mut sink);
    let outcome =
        GrowthLoop::new(settings, engine).run(&mut project.state, &mut project.lines)?;

    if json {
        print_json(&outcome)?;
    } else {
        println!(
            "Growth stopped: {} after {} pass(es)",
            outcome.stop, outcome.passes_completed
        );
        println!(
            "Lines: {} (target {})",
            outcome.final_lines, outcome.target_lines
        );
        if outcome.stop == StopReason::TooManyFailures {
            println!("Check failed chunks with 'prd status' and retry with 'prd retry --failed'");
        }
    }

    if outcome.aborted {
        anyhow::bail!(
            "growth aborted: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
