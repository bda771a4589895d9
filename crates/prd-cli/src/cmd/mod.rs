pub mod config;
pub mod doctor;
pub mod enhance;
pub mod grow;
pub mod init;
pub mod reset;
pub mod retry;
pub mod status;

use anyhow::Context;
use prd_core::{
    config::Config,
    engine::EngineConfig,
    io, paths,
    state::State,
    types::InvariantMode,
    PrdError,
};
use std::path::{Path, PathBuf};

/// Flags shared by `enhance` and `grow`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub dry_run: bool,
    pub lenient: bool,
    pub stub: bool,
}

impl RunFlags {
    pub fn engine_config(&self, config: &Config) -> EngineConfig {
        let mut engine = EngineConfig::from_config(config);
        engine.dry_run = self.dry_run;
        if self.lenient {
            engine.invariant_mode = InvariantMode::Lenient;
        }
        engine
    }
}

/// Config, document and state loaded and ready for a pass.
pub struct Project {
    pub config: Config,
    pub document: PathBuf,
    pub state_path: PathBuf,
    pub lines: Vec<String>,
    pub state: State,
}

/// Load everything a pass needs, applying resume repairs: a state whose line
/// count no longer matches the document is rebuilt, and chunks left running
/// by an interrupted run go back to pending. Repairs are saved unless
/// `persist` is false.
pub fn open_project(root: &Path, persist: bool) -> anyhow::Result<Project> {
    let config = Config::load(root).context("failed to load config")?;
    config.ensure_valid()?;

    let document = config.document_path(root);
    let lines = io::read_lines(&document).context("failed to read document")?;

    let state_path = paths::state_path(root);
    let mut state = match State::load(&state_path) {
        Ok(state) => state,
        Err(PrdError::StateNotFound) => {
            anyhow::bail!("no state at {}: run 'prd init' first", state_path.display())
        }
        Err(e) => return Err(e).context("failed to load state"),
    };

    let mut dirty = false;
    if state.is_stale(lines.len()) {
        tracing::warn!(
            recorded = state.total_lines,
            actual = lines.len(),
            "document changed outside prd, rebuilding chunk map"
        );
        let pass = state.growth.current_pass.max(1);
        state.rebuild(&lines, pass)?;
        dirty = true;
    }
    let reset = state.reset_running();
    if reset > 0 {
        tracing::info!(chunks = reset, "resuming: running chunks reset to pending");
        dirty = true;
    }
    if dirty && persist {
        state.save(&state_path).context("failed to save state")?;
    }

    Ok(Project {
        config,
        document,
        state_path,
        lines,
        state,
    })
}
