use std::time::{Duration, Instant};

use crate::process::{self, DriverProcess};
use crate::types::{DriverConfig, DriverOutput};
use crate::{DriverError, Result};

// ─── Public API ───────────────────────────────────────────────────────────

/// Send `prompt` through the driver and collect the transcript.
///
/// The whole exchange is bounded by `wait_seconds + grace_seconds`; on
/// timeout the driver is killed and [`DriverError::Timeout`] is returned.
pub async fn run(prompt: &str, config: &DriverConfig) -> Result<DriverOutput> {
    let started = Instant::now();
    let limit = config.timeout();
    tracing::debug!(
        program = %config.program,
        timeout_secs = limit.as_secs(),
        prompt_bytes = prompt.len(),
        "spawning driver"
    );

    let mut process = DriverProcess::spawn(prompt, config)?;
    let stdout = match tokio::time::timeout(limit, process.finish()).await {
        Ok(result) => result?,
        Err(_) => {
            process.kill().await;
            tracing::warn!(program = %config.program, "driver timed out, killed");
            return Err(DriverError::Timeout(limit.as_secs()));
        }
    };

    let transcript = if config.transcript_command.is_empty() {
        stdout
    } else {
        let remaining = limit
            .saturating_sub(started.elapsed())
            .max(Duration::from_secs(1));
        tokio::time::timeout(remaining, process::capture(&config.transcript_command))
            .await
            .map_err(|_| DriverError::Timeout(limit.as_secs()))??
    };

    if transcript.trim().is_empty() {
        return Err(DriverError::EmptyTranscript);
    }

    let elapsed = started.elapsed();
    tracing::debug!(
        elapsed_ms = elapsed.as_millis() as u64,
        transcript_bytes = transcript.len(),
        "driver finished"
    );
    Ok(DriverOutput {
        transcript,
        stderr: process.stderr(),
        elapsed,
    })
}

/// Blocking wrapper around [`run`] for synchronous callers.
///
/// Reuses the ambient runtime when called from inside one (requires the
/// multi-threaded flavour), otherwise builds a throwaway runtime.
pub fn run_blocking(prompt: &str, config: &DriverConfig) -> Result<DriverOutput> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(run(prompt, config))),
        Err(_) => {
            tracing::debug!("using new tokio runtime");
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(run(prompt, config))
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
