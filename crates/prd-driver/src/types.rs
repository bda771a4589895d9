use std::path::PathBuf;
use std::time::Duration;

// ─── DriverConfig ─────────────────────────────────────────────────────────

/// How to reach the external assistant.
///
/// The driver program receives the prompt on stdin. Its stdout is the
/// transcript, unless `transcript_command` is set, in which case that command
/// is run after the driver exits and its stdout is used instead (e.g.
/// `pbpaste` for drivers that leave the answer on the clipboard).
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Time the assistant is expected to need.
    pub wait_seconds: u64,
    /// Extra slack on top of `wait_seconds` before the driver is killed.
    pub grace_seconds: u64,
    pub transcript_command: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl DriverConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            wait_seconds: 60,
            grace_seconds: 30,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.wait_seconds.saturating_add(self.grace_seconds))
    }
}

// ─── DriverOutput ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DriverOutput {
    pub transcript: String,
    /// Whatever the driver wrote to stderr, even on success.
    pub stderr: String,
    pub elapsed: Duration,
}
