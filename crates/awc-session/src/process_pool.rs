//! Subprocess pool for agent processes, with capacity limits and async,
//! line-delimited stdout/stderr capture.
//!
//! Each spawned agent runs as a plain child process (no pseudo-terminal):
//! stdout and stderr are captured as two independent UTF-8 line streams per
//! the spawn contract in the orchestrator design, and the pool enforces a
//! configurable capacity limit so a runaway backlog can't exhaust the host.
//!
//! ## Architecture
//!
//! - [`ProcessPool`]: tracks up to `max_processes` concurrent child processes
//! - [`ProcessHandle`]: a single running process with async stdout/stderr/stdin
//! - Each spawn starts two background tasks (stdout reader, stderr reader)
//!   that forward complete lines over bounded `flume` channels
//!
//! ## Capacity management
//!
//! [`ProcessPool::spawn()`] returns [`ProcessError::AtCapacity`] once
//! `active_count() >= max_processes`. Callers must [`ProcessPool::release()`]
//! a handle (after killing it) to free the slot.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process pool is at capacity ({max})")]
    AtCapacity { max: usize },

    #[error("process handle not found: {0}")]
    HandleNotFound(Uuid),

    #[error("process spawn failed: {0}")]
    SpawnFailed(String),

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ProcessError>;

// ---------------------------------------------------------------------------
// ProcessHandle
// ---------------------------------------------------------------------------

/// A handle to one spawned agent process.
///
/// `stdout`/`stderr` yield complete lines (newline stripped) as they arrive;
/// `send_line` writes a line to the child's stdin. The handle owns the
/// background tasks that pump these streams and aborts them on drop.
pub struct ProcessHandle {
    pub id: Uuid,
    pub stdout: flume::Receiver<String>,
    pub stderr: flume::Receiver<String>,
    stdin: Mutex<Option<tokio::process::ChildStdin>>,
    child: Arc<Mutex<Child>>,
    _stdout_task: tokio::task::JoinHandle<()>,
    _stderr_task: tokio::task::JoinHandle<()>,
}

impl ProcessHandle {
    /// Non-blocking liveness check via `try_wait`.
    pub async fn is_alive(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// The exit status, if the process has already terminated.
    pub async fn exit_code(&self) -> Option<i32> {
        let mut child = self.child.lock().await;
        match child.try_wait() {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }

    /// Send `SIGKILL` (or platform equivalent) immediately.
    pub async fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        child
            .kill()
            .await
            .map_err(|e| ProcessError::Internal(e.to_string()))
    }

    /// Request a graceful exit by closing stdin, then wait up to `grace` for
    /// the process to exit on its own before the caller escalates to
    /// [`kill()`](Self::kill). Mirrors the orchestrator's
    /// graceful-then-forceful deadline handling.
    pub async fn terminate_gracefully(&self, grace: std::time::Duration) -> Result<bool> {
        {
            let mut stdin = self.stdin.lock().await;
            *stdin = None;
        }
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if !self.is_alive().await {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    /// Write a line (newline-terminated) to the process's stdin.
    pub async fn send_line(&self, line: &str) -> Result<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| ProcessError::Internal("stdin already closed".into()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ProcessError::Internal(format!("stdin write failed: {e}")))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| ProcessError::Internal(format!("stdin write failed: {e}")))?;
        Ok(())
    }

    /// Drain every currently buffered line from both streams, tagged by
    /// source, preserving arrival order within each stream.
    pub fn try_read_all(&self) -> Vec<(StreamSource, String)> {
        let mut out = Vec::new();
        while let Ok(line) = self.stdout.try_recv() {
            out.push((StreamSource::Stdout, line));
        }
        while let Ok(line) = self.stderr.try_recv() {
            out.push((StreamSource::Stderr, line));
        }
        out
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle").field("id", &self.id).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

// ---------------------------------------------------------------------------
// ProcessPool
// ---------------------------------------------------------------------------

/// Tracks active agent processes and enforces the process-wide concurrency
/// cap from configuration (`maxConcurrentAgents`, summed across projects).
pub struct ProcessPool {
    max_processes: usize,
    handles: Arc<Mutex<HashMap<Uuid, ()>>>,
}

impl ProcessPool {
    pub fn new(max_processes: usize) -> Self {
        info!(max_processes, "creating ProcessPool");
        Self {
            max_processes,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn active_count(&self) -> usize {
        self.handles.lock().await.len()
    }

    pub fn max_processes(&self) -> usize {
        self.max_processes
    }

    /// Spawn `cmd` with `args` in `workdir`, with `env` as the *entire*
    /// environment seen by the child — callers are responsible for having
    /// already stripped user-level model-API credentials before calling
    /// this (the agent authenticates itself via its own configuration).
    pub async fn spawn(
        &self,
        cmd: &str,
        args: &[&str],
        workdir: &str,
        env: &[(&str, &str)],
    ) -> Result<ProcessHandle> {
        {
            let handles = self.handles.lock().await;
            if handles.len() >= self.max_processes {
                return Err(ProcessError::AtCapacity { max: self.max_processes });
            }
        }

        // Credential-stripped environment: the child sees nothing inherited
        // from this process except `PATH` (needed to resolve the binary),
        // plus whatever the caller explicitly allow-listed in `env`.
        let mut command = Command::new(cmd);
        command
            .args(args)
            .current_dir(workdir)
            .env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .envs(env.iter().copied())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed(e.to_string()))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::SpawnFailed("no stdout handle".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessError::SpawnFailed("no stderr handle".into()))?;

        debug!(cmd, ?args, workdir, "spawned agent process");

        let handle_id = Uuid::new_v4();

        let (stdout_tx, stdout_rx) = flume::bounded::<String>(4000);
        let stdout_task = tokio::spawn(pump_lines(BufReader::new(stdout), stdout_tx, StreamSource::Stdout));

        let (stderr_tx, stderr_rx) = flume::bounded::<String>(4000);
        let stderr_task = tokio::spawn(pump_lines(BufReader::new(stderr), stderr_tx, StreamSource::Stderr));

        {
            let mut handles = self.handles.lock().await;
            handles.insert(handle_id, ());
        }

        Ok(ProcessHandle {
            id: handle_id,
            stdout: stdout_rx,
            stderr: stderr_rx,
            stdin: Mutex::new(stdin),
            child: Arc::new(Mutex::new(child)),
            _stdout_task: stdout_task,
            _stderr_task: stderr_task,
        })
    }

    /// Remove a handle from pool tracking once the caller is done with it
    /// (after killing or observing natural exit). Idempotent.
    pub async fn release(&self, handle_id: Uuid) {
        let mut handles = self.handles.lock().await;
        handles.remove(&handle_id);
        debug!(%handle_id, "released process handle from pool");
    }
}

impl std::fmt::Debug for ProcessPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPool")
            .field("max_processes", &self.max_processes)
            .finish()
    }
}

async fn pump_lines<R: tokio::io::AsyncRead + Unpin>(
    reader: BufReader<R>,
    tx: flume::Sender<String>,
    source: StreamSource,
) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send_async(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(?source, "process stream read error: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_captures_stdout_lines() {
        let pool = ProcessPool::new(2);
        let handle = pool
            .spawn("printf", &["hello\\nworld\\n"], ".", &[])
            .await
            .unwrap();

        let first = handle.stdout.recv_async().await.unwrap();
        let second = handle.stdout.recv_async().await.unwrap();
        assert_eq!(first, "hello");
        assert_eq!(second, "world");
        pool.release(handle.id).await;
    }

    #[tokio::test]
    async fn pool_rejects_spawn_past_capacity() {
        let pool = ProcessPool::new(1);
        let first = pool.spawn("sleep", &["5"], ".", &[]).await.unwrap();
        let err = pool.spawn("sleep", &["5"], ".", &[]).await;
        assert!(matches!(err, Err(ProcessError::AtCapacity { max: 1 })));
        first.kill().await.unwrap();
        pool.release(first.id).await;
    }

    #[tokio::test]
    async fn kill_terminates_the_process() {
        let pool = ProcessPool::new(1);
        let handle = pool.spawn("sleep", &["30"], ".", &[]).await.unwrap();
        assert!(handle.is_alive().await);
        handle.kill().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_alive().await);
        pool.release(handle.id).await;
    }
}
