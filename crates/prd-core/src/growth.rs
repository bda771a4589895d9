use crate::config::GrowthConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::state::State;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    AllChunksDone,
    NoEligibleChunks,
    TooManyFailures,
    MaxPasses,
    DryRun,
    Aborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::TargetReached => "target reached",
            StopReason::AllChunksDone => "all chunks done",
            StopReason::NoEligibleChunks => "no eligible chunks",
            StopReason::TooManyFailures => "too many consecutive failures",
            StopReason::MaxPasses => "max passes reached",
            StopReason::DryRun => "dry run",
            StopReason::Aborted => "aborted",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthOutcome {
    pub passes_completed: u32,
    pub final_lines: usize,
    pub target_lines: usize,
    pub stop: StopReason,
    pub aborted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drives repeated engine passes until the document is big enough or a stop
/// condition fires.
pub struct GrowthLoop<'a> {
    settings: GrowthConfig,
    engine: Engine<'a>,
}

impl<'a> GrowthLoop<'a> {
    pub fn new(settings: GrowthConfig, engine: Engine<'a>) -> Self {
        Self { settings, engine }
    }

    fn target_reached(&self, lines: usize) -> bool {
        let target = self.settings.target_line_count as f64;
        lines as f64 >= target * self.settings.target_tolerance
    }

    pub fn run(&mut self, state: &mut State, lines: &mut Vec<String>) -> Result<GrowthOutcome> {
        let dry_run = self.engine.config().dry_run;
        let mut passes = 0u32;

        let stop = loop {
            if self.target_reached(lines.len()) {
                break StopReason::TargetReached;
            }
            if passes >= self.settings.max_passes {
                break StopReason::MaxPasses;
            }

            let pass = state.growth.total_passes_run + 1;
            if self.settings.rebuild_each_pass || state.is_stale(lines.len()) {
                state.rebuild(lines, pass)?;
            } else {
                state.reset_running();
                state.growth.current_pass = pass;
            }

            if state.eligible_ids().is_empty() {
                break if self.settings.stop_when_all_done {
                    StopReason::AllChunksDone
                } else {
                    StopReason::NoEligibleChunks
                };
            }

            info!(
                pass,
                lines = lines.len(),
                target = self.settings.target_line_count,
                "starting growth pass"
            );
            let result = self.engine.run_pass(
                state,
                lines,
                Some(self.settings.max_chunks_per_pass),
            );
            let stats = match result {
                Ok(stats) => stats,
                Err(e) => {
                    error!(pass, error = %e, "growth pass aborted");
                    let msg = Some(e.to_string());
                    return Ok(self.outcome(passes, lines.len(), StopReason::Aborted, msg));
                }
            };

            passes += 1;
            if dry_run {
                break StopReason::DryRun;
            }

            let stopped_early = stats.stopped_early;
            state.growth.total_passes_run = pass;
            state.growth.last_pass = Some(stats);
            if let Err(e) = self.engine.persist(state) {
                error!(pass, error = %e, "failed to save state after pass");
                let msg = Some(e.to_string());
                return Ok(self.outcome(passes, lines.len(), StopReason::Aborted, msg));
            }

            if stopped_early {
                warn!(pass, "pass stopped by the failure circuit breaker");
                break StopReason::TooManyFailures;
            }
        };

        info!(passes, lines = lines.len(), stop = %stop, "growth finished");
        Ok(self.outcome(passes, lines.len(), stop, None))
    }

    fn outcome(
        &self,
        passes_completed: u32,
        final_lines: usize,
        stop: StopReason,
        error: Option<String>,
    ) -> GrowthOutcome {
        GrowthOutcome {
            passes_completed,
            final_lines,
            target_lines: self.settings.target_line_count,
            stop,
            aborted: stop == StopReason::Aborted,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
