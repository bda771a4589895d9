use crate::output::print_json;
use anyhow::Context;
use prd_core::{
    config::Config,
    doctor::{self, Severity},
    io, paths,
    state::State,
};
use std::path::Path;

pub fn run(root: &Path, fix: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let lines = io::read_lines(&config.document_path(root)).ok();
    let state_path = paths::state_path(root);
    let state = State::load(&state_path);

    let mut report = doctor::diagnose(&config, &state, lines.as_deref());
    tracing::debug!(command = "doctor", severity = %report.severity, issues = report.issues.len());

    let wants_fix = fix || config.safety.doctor_auto_fix;
    let mut applied = Vec::new();
    if wants_fix && report.state_unreadable {
        tracing::warn!(path = %state_path.display(), "state is unreadable, leaving it untouched");
    } else if wants_fix && report.severity != Severity::Ok {
        match &lines {
            Some(lines) => {
                let (mut fixed, done) = doctor::fix(&config, &report, state.ok(), lines)
                    .context("doctor fix failed")?;
                fixed.save(&state_path).context("failed to save state")?;
                applied = done;
                let reloaded = State::load(&state_path);
                report = doctor::diagnose(&config, &reloaded, Some(lines.as_slice()));
            }
            None => tracing::warn!("document is missing, nothing to repair against"),
        }
    }

    if json {
        print_json(&serde_json::json!({
            "report": report,
            "fixes": applied,
        }))?;
    } else {
        for done in &applied {
            println!("fixed: {done}");
        }
        if report.issues.is_empty() {
            println!("No problems found.");
        }
        for issue in &report.issues {
            println!("[{}] {}", issue.severity, issue.message);
        }
        if let Some(counts) = report.status_counts {
            println!(
                "chunks: {} pending, {} running, {} done, {} failed",
                counts.pending, counts.running, counts.done, counts.failed
            );
        }
        if report.state_unreadable {
            println!("Run 'prd reset' to back up the unreadable state, then 'prd init'.");
        } else if report.needs_rebuild && !wants_fix {
            println!("Run 'prd doctor --fix' to rebuild the chunk map.");
        } else if report.running_chunks() > 0 && !wants_fix {
            println!("Run 'prd doctor --fix' to reset running chunks.");
        }
    }

    if report.severity == Severity::Error {
        anyhow::bail!("doctor found errors");
    }
    Ok(())
}
