//! Subprocess spawning with output capture and a hard timeout.
//!
//! [`run_command`] is the only place the transform executor touches
//! `tokio::process`. The caller builds the [`Command`] (program and
//! arguments); this module wires up pipes, waits with a deadline and kills
//! the child when the deadline passes.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (1 MiB).
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Captured result of a process that ran to exit.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// Errors that prevent a process from running to exit.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to run command: {0}")]
    Io(#[from] std::io::Error),

    #[error("command timed out after {}s", .limit.as_secs_f64())]
    Timeout { limit: Duration, elapsed: Duration },
}

/// Spawn `cmd`, capture stdout/stderr and wait at most `timeout` for it to
/// exit and for both streams to close. On timeout the child is killed.
///
/// The deadline also covers the streams, so a background process that
/// inherited them cannot hold the caller past `timeout`.
pub async fn run_command(
    cmd: &mut Command,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    // Drain the pipes concurrently so a chatty tool cannot block on a full
    // pipe while we wait for it.
    let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let finished = async {
        let status = child.wait().await?;
        let stdout = (&mut stdout_task).await.unwrap_or_default();
        let stderr = (&mut stderr_task).await.unwrap_or_default();
        Ok::<_, std::io::Error>((status, stdout, stderr))
    };
    let result = tokio::time::timeout(timeout, finished).await;

    match result {
        Ok(Ok((status, stdout_bytes, stderr_bytes))) => Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            exit_code: status.code().unwrap_or(-1),
            elapsed: start.elapsed(),
        }),
        Ok(Err(e)) => {
            stdout_task.abort();
            stderr_task.abort();
            Err(CommandError::Io(e))
        }
        Err(_elapsed) => {
            // The child may already have exited with a descendant still
            // holding its pipes.
            if matches!(child.try_wait(), Ok(None)) {
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "Failed to kill timed-out process");
                }
            }
            stdout_task.abort();
            stderr_task.abort();
            Err(CommandError::Timeout {
                limit: timeout,
                elapsed: start.elapsed(),
            })
        }
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}
