use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use prd_core::{
    config::Config,
    io, paths,
    state::{State, StatusCounts},
    types::ChunkStatus,
    PrdError,
};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatusOutput<'a> {
    document: String,
    document_lines: Option<usize>,
    total_lines: usize,
    chunk_size: usize,
    stale: bool,
    counts: StatusCounts,
    percent_done: f64,
    growth: &'a prd_core::state::GrowthMeta,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<&'a [prd_core::state::Chunk]>,
    failed: Vec<FailedChunk<'a>>,
}

#[derive(Serialize)]
struct FailedChunk<'a> {
    id: u32,
    phase_id: &'a str,
    attempts: u32,
    error: Option<&'a str>,
}

pub fn run(root: &Path, verbose: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let state = match State::load(&paths::state_path(root)) {
        Ok(state) => state,
        Err(PrdError::StateNotFound) => {
            anyhow::bail!("no state found: run 'prd init' first")
        }
        Err(e) => return Err(e).context("failed to load state"),
    };
    let document = config.document_path(root);
    let document_lines = io::read_lines(&document).ok().map(|l| l.len());
    let stale = document_lines.is_some_and(|n| state.is_stale(n));

    let counts = state.status_counts();
    let percent_done = if counts.total() == 0 {
        100.0
    } else {
        counts.done as f64 * 100.0 / counts.total() as f64
    };
    let failed: Vec<FailedChunk> = state
        .failed()
        .map(|c| FailedChunk {
            id: c.id,
            phase_id: &c.phase_id,
            attempts: c.attempts,
            error: c.last_error.as_deref(),
        })
        .collect();

    if json {
        return print_json(&StatusOutput {
            document: config.document.display().to_string(),
            document_lines,
            total_lines: state.total_lines,
            chunk_size: state.chunk_size,
            stale,
            counts,
            percent_done,
            growth: &state.growth,
            updated_at: state.updated_at.to_rfc3339(),
            chunks: verbose.then_some(state.chunks.as_slice()),
            failed,
        });
    }

    println!("Document: {}", config.document.display());
    match document_lines {
        Some(n) if stale => println!(
            "Lines:    {n} (state records {}; next run rebuilds the chunk map)",
            state.total_lines
        ),
        Some(n) => println!("Lines:    {n}"),
        None => println!("Lines:    document missing (state records {})", state.total_lines),
    }
    println!(
        "Chunks:   {} x {} lines, {percent_done:.1}% done",
        counts.total(),
        state.chunk_size
    );
    for status in ChunkStatus::all() {
        println!("  {:<8} {}", status.as_str(), counts.get(*status));
    }
    if state.growth.total_passes_run > 0 {
        println!("Passes:   {}", state.growth.total_passes_run);
        if let Some(last) = &state.growth.last_pass {
            println!(
                "  last: {} ok / {} failed, {} -> {} lines{}",
                last.succeeded,
                last.failed,
                last.lines_before,
                last.lines_after,
                if last.stopped_early { " (stopped early)" } else { "" }
            );
        }
    }
    println!("Updated:  {}", state.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    if !failed.is_empty() {
        println!("\nFailed chunks:");
        for f in &failed {
            println!(
                "  {} ({}, {} attempt(s)): {}",
                f.id,
                f.phase_id,
                f.attempts,
                f.error.unwrap_or("unknown error")
            );
        }
        println!("Retry with: prd retry --failed");
    }

    if verbose {
        println!();
        let rows: Vec<Vec<String>> = state
            .chunks
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.phase_id.clone(),
                    format!("{}-{}", c.start_line, c.end_line),
                    c.status.to_string(),
                    c.attempts.to_string(),
                    truncate(c.title.as_deref().unwrap_or("-"), 32),
                    truncate(c.last_error.as_deref().unwrap_or(""), 40),
                ]
            })
            .collect();
        print_table(
            &["ID", "PHASE", "LINES", "STATUS", "TRIES", "TITLE", "ERROR"],
            rows,
        );
    }

    Ok(())
}
