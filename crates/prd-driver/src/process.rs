use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::types::DriverConfig;
use crate::{DriverError, Result};

// ─── DriverProcess ────────────────────────────────────────────────────────

/// A running driver subprocess.
///
/// The prompt is written to stdin by a background task and stdin is closed
/// afterwards. Stderr is drained into a buffer by another task and surfaced
/// on exit errors.
pub(crate) struct DriverProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr_buf: Arc<Mutex<String>>,
    stderr_task: Option<JoinHandle<()>>,
}

impl DriverProcess {
    pub(crate) fn spawn(prompt: &str, config: &DriverConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args);
        for (k, v) in &config.env {
            cmd.env(k, v);
        }
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| DriverError::Spawn {
            program: config.program.clone(),
            source,
        })?;

        // Write from a task so a driver that never reads stdin cannot block us
        // on a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_owned();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    tracing::debug!(error = %e, "driver closed stdin before reading the prompt");
                    return;
                }
                let _ = stdin.shutdown().await;
            });
        }

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        let stderr_task = child.stderr.take().map(|stderr| {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            })
        });

        let stdout = child.stdout.take();
        Ok(Self {
            child,
            stdout,
            stderr_buf,
            stderr_task,
        })
    }

    /// Read stdout to EOF, then wait for exit. Non-zero exit is an error that
    /// carries the captured stderr.
    pub(crate) async fn finish(&mut self) -> Result<String> {
        let mut out = String::new();
        if let Some(mut stdout) = self.stdout.take() {
            stdout.read_to_string(&mut out).await?;
        }

        let status = self.child.wait().await?;
        if let Some(task) = self.stderr_task.take() {
            let _ = task.await;
        }
        if status.success() {
            return Ok(out);
        }

        let stderr = self.stderr();
        let head = match status.code() {
            Some(code) => format!("driver exited with code {code}"),
            None => "driver terminated by signal".to_string(),
        };
        Err(DriverError::Exit(if stderr.is_empty() {
            head
        } else {
            format!("{head}\nstderr: {stderr}")
        }))
    }

    pub(crate) fn stderr(&self) -> String {
        self.stderr_buf
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    /// Kill the subprocess (best-effort; errors are ignored).
    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Run `argv` to completion and return its stdout.
pub(crate) async fn capture(argv: &[String]) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| DriverError::Transcript("empty command".into()))?;
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| DriverError::Transcript(format!("{program}: {e}")))?;
    if !output.status.success() {
        return Err(DriverError::Transcript(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
