use crate::config::{Config, WarnLevel};
use crate::error::{PrdError, Result};
use crate::state::{State, StatusCounts};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Ok => "ok",
            Severity::Warn => "warn",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub severity: Severity,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<StatusCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_lines: Option<usize>,
    pub needs_rebuild: bool,
    /// The state file exists but could not be loaded. Fixes never touch it.
    pub state_unreadable: bool,
}

impl DoctorReport {
    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.severity = self.severity.max(severity);
        self.issues.push(Issue {
            severity,
            message: message.into(),
        });
    }

    pub fn running_chunks(&self) -> usize {
        self.status_counts.map(|c| c.running).unwrap_or(0)
    }
}

/// Inspect config, state and document for problems. `lines` is `None` when
/// the document could not be read.
pub fn diagnose(config: &Config, state: &Result<State>, lines: Option<&[String]>) -> DoctorReport {
    let mut report = DoctorReport {
        severity: Severity::Ok,
        issues: Vec::new(),
        status_counts: None,
        document_lines: lines.map(<[String]>::len),
        needs_rebuild: false,
        state_unreadable: false,
    };

    for w in config.validate() {
        let severity = match w.level {
            WarnLevel::Warning => Severity::Warn,
            WarnLevel::Error => Severity::Error,
        };
        report.push(severity, format!("config: {}", w.message));
    }

    if lines.is_none() {
        report.push(
            Severity::Error,
            format!("document {} is missing", config.document.display()),
        );
    }

    let state = match state {
        Ok(state) => state,
        Err(PrdError::StateNotFound) => {
            report.push(Severity::Warn, "state file is missing: run 'prd init'");
            report.needs_rebuild = true;
            return report;
        }
        Err(e) => {
            report.push(Severity::Error, format!("state: {e}"));
            report.push(
                Severity::Error,
                "state is unreadable and will not be repaired: run 'prd reset' to back it up \
                 and start over",
            );
            report.state_unreadable = true;
            return report;
        }
    };

    let counts = state.status_counts();
    report.status_counts = Some(counts);

    if let Some(lines) = lines {
        let actual = lines.len();
        if state.is_stale(actual) {
            report.push(
                Severity::Warn,
                format!(
                    "state records {} lines but the document has {actual}",
                    state.total_lines
                ),
            );
            report.needs_rebuild = true;
        }
        if let Err(e) = state.check_coverage(actual) {
            report.push(Severity::Error, e.to_string());
            report.needs_rebuild = true;
        }
    }

    if counts.running > 0 {
        report.push(
            Severity::Warn,
            format!(
                "{} chunk(s) left running by an interrupted run",
                counts.running
            ),
        );
    }
    if counts.failed > 0 {
        let ids: Vec<String> = state.failed().map(|c| c.id.to_string()).collect();
        report.push(
            Severity::Warn,
            format!("{} failed chunk(s): {}", counts.failed, ids.join(", ")),
        );
    }

    report
}

/// Apply the safe repairs for `report`: rebuild the chunk map when it no
/// longer matches the document, otherwise return running chunks to pending.
/// `state` is `None` only when no state file exists. An unreadable state file
/// is refused. Returns the repaired state and a description of each repair.
pub fn fix(
    config: &Config,
    report: &DoctorReport,
    state: Option<State>,
    lines: &[String],
) -> Result<(State, Vec<String>)> {
    if report.state_unreadable {
        return Err(PrdError::UnrepairableState);
    }
    let mut applied = Vec::new();

    let state = match state {
        Some(mut state) if report.needs_rebuild => {
            let pass = state.growth.current_pass.max(1);
            state.rebuild(lines, pass)?;
            applied.push(format!(
                "rebuilt chunk map: {} chunks over {} lines",
                state.chunks.len(),
                lines.len()
            ));
            state
        }
        Some(mut state) => {
            let n = state.reset_running();
            if n > 0 {
                applied.push(format!("reset {n} running chunk(s) to pending"));
            }
            state
        }
        None => {
            let state = State::build(
                config.document.to_string_lossy(),
                lines,
                config.chunk_size_lines,
                1,
            )?;
            applied.push(format!("created state with {} chunks", state.chunks.len()));
            state
        }
    };

    Ok((state, applied))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
