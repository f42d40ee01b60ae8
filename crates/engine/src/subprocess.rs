//! Child process execution for the engine.
//!
//! [`run_command`] spawns a prepared [`Command`], captures stdout/stderr in
//! background tasks and enforces a wall-clock timeout. The child is killed
//! if the timeout fires.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::engine::EngineError;

/// Maximum stdout or stderr size kept per stream (10 MiB). Earlier output
/// is discarded; the pipe is always drained to EOF.
///
/// The engine prints a progress bar per chunk to stderr; long inputs can
/// produce a lot of it.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Number of trailing stderr characters kept in an error message.
const ERROR_TAIL_CHARS: usize = 4000;

/// Captured output of a finished child process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into [`EngineError::Failed`] carrying the
    /// tail of stderr (or stdout when stderr is empty).
    pub fn into_result(self) -> Result<Self, EngineError> {
        if self.success() {
            return Ok(self);
        }
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        Err(EngineError::Failed {
            exit_code: self.exit_code,
            stderr: tail(text.trim(), ERROR_TAIL_CHARS).to_string(),
        })
    }
}

/// Spawn `cmd`, wait for it to exit within `timeout`, and capture output.
///
/// The caller sets program and arguments. stdin is closed; the engine reads
/// its input from the path given on the command line.
pub async fn run_command(cmd: &mut Command, timeout: Duration) -> Result<CommandOutput, EngineError> {
    // `kill_on_drop(true)` ensures the child is killed when dropped (e.g. on timeout).
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = cmd
        .spawn()
        .map_err(|source| EngineError::NotFound { program, source })?;

    // Read pipes in spawned tasks so `child.wait()` can borrow `&mut child`.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(read_tail(stdout_handle, MAX_OUTPUT_BYTES));
    let stderr_task = tokio::spawn(read_tail(stderr_handle, MAX_OUTPUT_BYTES));

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Ok(Err(e)) => Err(EngineError::Io(e)),
        // `child` is dropped on return, which kills the process.
        Err(_elapsed) => Err(EngineError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    }
}

/// Read a stream to EOF and return its last `limit` bytes.
async fn read_tail<R: AsyncRead + Unpin>(handle: Option<R>, limit: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut h) = handle else {
        return buf;
    };

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match h.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                // Trim in batches so the front is not shifted on every read.
                if buf.len() > limit.saturating_mul(2) {
                    buf.drain(..buf.len() - limit);
                }
            }
        }
    }

    if buf.len() > limit {
        buf.drain(..buf.len() - limit);
    }
    buf
}

/// Last `max_chars` characters of `text`.
fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let byte_idx = text
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &text[byte_idx..]
}
