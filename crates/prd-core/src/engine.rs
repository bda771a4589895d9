use crate::config::Config;
use crate::error::{PrdError, Result};
use crate::provider::{ChunkContext, EnhancementProvider};
use crate::state::{State, StateStore};
use crate::types::InvariantMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// PassStats / EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub lines_before: usize,
    pub lines_after: usize,
    pub consecutive_failures: u32,
    pub stopped_early: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub min_length_ratio: f64,
    pub max_consecutive_failures: u32,
    pub invariant_mode: InvariantMode,
    pub dry_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_length_ratio: 0.9,
            max_consecutive_failures: 5,
            invariant_mode: InvariantMode::Strict,
            dry_run: false,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_length_ratio: config.min_length_ratio,
            max_consecutive_failures: config.safety.max_consecutive_failures,
            invariant_mode: config.safety.invariant_mode,
            dry_run: false,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentSink
// ---------------------------------------------------------------------------

/// Receives the whole document after every successful splice, before the
/// state is saved.
pub trait DocumentSink {
    fn write_document(&mut self, lines: &[String]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSink for FileDocument {
    fn write_document(&mut self, lines: &[String]) -> Result<()> {
        crate::io::write_lines(&self.path, lines)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

enum ChunkOutcome {
    Done,
    Failed,
}

pub struct Engine<'a> {
    config: EngineConfig,
    provider: &'a mut dyn EnhancementProvider,
    store: &'a mut dyn StateStore,
    sink: Option<&'a mut dyn DocumentSink>,
}

impl<'a> Engine<'a> {
    pub fn new(
        config: EngineConfig,
        provider: &'a mut dyn EnhancementProvider,
        store: &'a mut dyn StateStore,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: &'a mut dyn DocumentSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Save `state` through the engine's store. Dry runs never persist.
    pub fn persist(&mut self, state: &mut State) -> Result<()> {
        if self.config.dry_run {
            return Ok(());
        }
        self.store.save(state)
    }

    /// Process eligible chunks in id order, at most `max_chunks` of them.
    ///
    /// Per-chunk failures are recorded on the chunk and the pass moves on.
    /// The pass returns an error only for a strict-mode invariant violation
    /// or when the state itself cannot be persisted. In strict mode a map
    /// whose chunks overlap or leave gaps is rejected before anything runs.
    pub fn run_pass(
        &mut self,
        state: &mut State,
        lines: &mut Vec<String>,
        max_chunks: Option<usize>,
    ) -> Result<PassStats> {
        if self.config.invariant_mode == InvariantMode::Strict {
            if let Err(e) = state.check_coverage(state.total_lines) {
                error!(error = %e, "chunk map is inconsistent, aborting pass");
                return Err(e);
            }
        }

        let mut ids = state.eligible_ids();
        if let Some(max) = max_chunks {
            ids.truncate(max);
        }

        let mut stats = PassStats {
            lines_before: lines.len(),
            ..PassStats::default()
        };
        info!(
            chunks = ids.len(),
            lines = lines.len(),
            provider = self.provider.name(),
            dry_run = self.config.dry_run,
            "starting pass"
        );

        let remaining = ids.len();
        for (n, id) in ids.into_iter().enumerate() {
            stats.attempted += 1;

            if self.config.dry_run {
                if let Some(c) = state.chunk(id) {
                    info!(
                        chunk = id,
                        phase_id = %c.phase_id,
                        start = c.start_line,
                        end = c.end_line,
                        "dry run: would enhance chunk"
                    );
                }
                continue;
            }

            match self.process_chunk(state, lines, id)? {
                ChunkOutcome::Done => {
                    stats.succeeded += 1;
                    stats.consecutive_failures = 0;
                }
                ChunkOutcome::Failed => {
                    stats.failed += 1;
                    stats.consecutive_failures += 1;
                    if stats.consecutive_failures >= self.config.max_consecutive_failures {
                        warn!(
                            consecutive_failures = stats.consecutive_failures,
                            skipped = remaining - n - 1,
                            "too many consecutive failures, stopping pass"
                        );
                        stats.stopped_early = true;
                        break;
                    }
                }
            }
        }

        stats.lines_after = lines.len();
        info!(
            attempted = stats.attempted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            lines_before = stats.lines_before,
            lines_after = stats.lines_after,
            "pass finished"
        );
        Ok(stats)
    }

    fn process_chunk(
        &mut self,
        state: &mut State,
        lines: &mut Vec<String>,
        id: u32,
    ) -> Result<ChunkOutcome> {
        let idx = state
            .chunks
            .iter()
            .position(|c| c.id == id)
            .ok_or(PrdError::UnknownChunk(id))?;

        let total = lines.len();
        if !state.chunks[idx].fits(total) {
            let chunk = &state.chunks[idx];
            let violation = PrdError::InvariantViolation {
                chunk_id: id,
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                total_lines: total,
            };
            match self.config.invariant_mode {
                InvariantMode::Strict => {
                    error!(chunk = id, error = %violation, "aborting pass");
                    return Err(violation);
                }
                InvariantMode::Lenient => {
                    warn!(chunk = id, error = %violation, "skipping chunk");
                    state.chunks[idx].mark_failed(violation.to_string());
                    self.store.save(state)?;
                    return Ok(ChunkOutcome::Failed);
                }
            }
        }

        state.chunks[idx].mark_running();
        self.store.save(state)?;

        let chunk = &state.chunks[idx];
        let (start, end) = (chunk.start_line, chunk.end_line);
        let ctx = ChunkContext {
            chunk_id: id,
            phase_id: chunk.phase_id.clone(),
            start_line: start,
            end_line: end,
            title: chunk.title.clone(),
        };
        info!(chunk = id, phase_id = %ctx.phase_id, start, end, "enhancing chunk");

        let original = lines[start - 1..end].join("\n");
        let replacement = match self.provider.provide_replacement(&original, &ctx) {
            Ok(text) => text,
            Err(e) => return self.fail(state, idx, e.to_string()),
        };

        if let Err(msg) = check_ratio(&original, &replacement, self.config.min_length_ratio) {
            return self.fail(state, idx, msg);
        }

        let mut new_lines: Vec<String> = replacement.lines().map(str::to_owned).collect();
        if new_lines.is_empty() {
            new_lines.push(String::new());
        }
        let new_len = new_lines.len();
        let old_lines: Vec<String> = lines.splice(start - 1..end, new_lines).collect();

        if let Some(sink) = self.sink.as_deref_mut() {
            if let Err(e) = sink.write_document(lines) {
                let _ours: Vec<String> = lines
                    .splice(start - 1..start - 1 + new_len, old_lines)
                    .collect();
                return self.fail(state, idx, format!("document write failed: {e}"));
            }
        }

        let delta = new_len as isize - (end + 1 - start) as isize;
        for later in state.chunks.iter_mut().filter(|c| c.id > id) {
            later.shift(delta);
        }
        let chunk = &mut state.chunks[idx];
        chunk.end_line = start + new_len - 1;
        chunk.mark_done();
        state.total_lines = lines.len();
        self.store.save(state)?;

        info!(chunk = id, delta, total_lines = state.total_lines, "chunk done");
        Ok(ChunkOutcome::Done)
    }

    fn fail(&mut self, state: &mut State, idx: usize, msg: String) -> Result<ChunkOutcome> {
        let chunk = &mut state.chunks[idx];
        warn!(chunk = chunk.id, phase_id = %chunk.phase_id, error = %msg, "chunk failed");
        chunk.mark_failed(msg);
        self.store.save(state)?;
        Ok(ChunkOutcome::Failed)
    }
}

/// Reject replacements shorter than `min_ratio` of the original, counted in
/// characters. An empty original accepts anything.
pub fn check_ratio(
    original: &str,
    replacement: &str,
    min_ratio: f64,
) -> std::result::Result<(), String> {
    let orig = original.chars().count();
    if orig == 0 {
        return Ok(());
    }
    let new = replacement.chars().count();
    if (new as f64) < min_ratio * orig as f64 {
        return Err(format!(
            "ratio {:.2} < min {:.2}",
            new as f64 / orig as f64,
            min_ratio
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
