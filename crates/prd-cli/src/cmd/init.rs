use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use prd_core::{config::Config, io, paths, skeleton, state::State};
use std::path::Path;

pub fn run(
    root: &Path,
    chunk_size: Option<usize>,
    force: bool,
    description: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    if !json {
        println!("Initializing prd in: {}", root.display());
    }

    // 1. Config
    let config_path = paths::config_path(root);
    let config_existed = config_path.exists();
    let mut config = Config::load(root).context("failed to load config")?;
    if let Some(description) = description {
        config.project.description = Some(description.to_string());
    }
    let resized = chunk_size.is_some_and(|n| n != config.chunk_size_lines);
    if let Some(n) = chunk_size {
        config.chunk_size_lines = n;
    }
    config.ensure_valid()?;
    if !config_existed || resized || description.is_some() {
        config.save(root).context("failed to write config.yaml")?;
    }
    report(json, !config_existed, paths::CONFIG_FILE);

    // 2. Document
    let document = config.document_path(root);
    let created_doc = if document.exists() {
        false
    } else {
        let text = skeleton::render(
            &config.project.name,
            config.project.description.as_deref(),
            Utc::now(),
        );
        io::write_if_missing(&document, text.as_bytes())
            .with_context(|| format!("failed to create {}", document.display()))?
    };
    report(json, created_doc, &config.document.display().to_string());

    // 3. State
    let state_path = paths::state_path(root);
    let state_existed = state_path.exists();
    let built = if state_existed && !force {
        if !json {
            println!(
                "  state exists, chunk map kept (use --force to rebuild from {})",
                config.document.display()
            );
        }
        None
    } else {
        let lines = io::read_lines(&document).context("failed to read document")?;
        let mut state = State::build(
            config.document.to_string_lossy(),
            &lines,
            config.chunk_size_lines,
            1,
        )?;
        state.save(&state_path).context("failed to write state.json")?;
        tracing::info!(
            chunks = state.chunks.len(),
            lines = lines.len(),
            chunk_size = config.chunk_size_lines,
            "chunk map built"
        );
        if !json {
            let verb = if state_existed { "rebuilt:" } else { "created:" };
            println!(
                "  {verb} {} ({} chunks over {} lines)",
                paths::STATE_FILE,
                state.chunks.len(),
                lines.len()
            );
        }
        Some(state)
    };

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "config_created": !config_existed,
            "document_created": created_doc,
            "state_written": built.is_some(),
            "chunks": built.as_ref().map(|s| s.chunks.len()),
            "total_lines": built.as_ref().map(|s| s.total_lines),
        }))?;
    } else {
        println!("\nNext: prd status, then prd enhance or prd grow");
    }
    Ok(())
}

fn report(json: bool, created: bool, what: &str) {
    if json {
        return;
    }
    if created {
        println!("  created: {what}");
    } else {
        println!("  exists:  {what}");
    }
}
