use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::cli_adapter::{adapter_for, AgentKind, CliAdapter};
use crate::process_pool::{ProcessHandle, ProcessPool, Result, StreamSource};

/// Why an agent session is considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The agent protocol's explicit `DONE` marker was seen on a stream.
    DoneMarker,
    /// Both streams closed and the process exited.
    EndOfStream,
}

/// Ties together an agent identity, its process handle, and the CLI adapter
/// used to launch it. One `AgentSession` corresponds to exactly one
/// orchestrator run of one card.
pub struct AgentSession {
    pub agent_id: Uuid,
    pub handle: ProcessHandle,
    adapter: Box<dyn CliAdapter>,
}

impl AgentSession {
    pub async fn spawn(
        pool: &ProcessPool,
        agent_id: Uuid,
        kind: AgentKind,
        task: &str,
        workdir: &str,
        env: &[(&str, &str)],
    ) -> Result<Self> {
        let adapter = adapter_for(kind);
        info!(%agent_id, cli = adapter.binary_name(), "spawning agent session");
        let handle = adapter.spawn(pool, task, workdir, env).await?;
        Ok(Self {
            agent_id,
            handle,
            adapter,
        })
    }

    pub async fn send_command(&self, cmd: &str) -> Result<()> {
        debug!(%self.agent_id, cmd, "sending command to agent");
        self.handle.send_line(cmd).await
    }

    /// Drains every currently buffered line from both streams.
    pub fn read_output(&self) -> Vec<(StreamSource, String)> {
        self.handle.try_read_all()
    }

    /// Waits up to `timeout` for the next line on either stream.
    pub async fn read_line_timeout(&self, timeout: Duration) -> Option<(StreamSource, String)> {
        tokio::time::timeout(timeout, async {
            tokio::select! {
                Ok(line) = self.handle.stdout.recv_async() => Some((StreamSource::Stdout, line)),
                Ok(line) = self.handle.stderr.recv_async() => Some((StreamSource::Stderr, line)),
                else => None,
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Inspects a line the caller just read for the done marker, per the
    /// termination-detector contract (§4.3): explicit marker, or
    /// end-of-stream once the process has exited.
    pub async fn check_termination(&self, line: &str) -> Option<TerminationReason> {
        if self.adapter.is_done_marker(line) {
            return Some(TerminationReason::DoneMarker);
        }
        if !self.handle.is_alive().await {
            return Some(TerminationReason::EndOfStream);
        }
        None
    }

    pub async fn is_alive(&self) -> bool {
        self.handle.is_alive().await
    }

    pub async fn exit_code(&self) -> Option<i32> {
        self.handle.exit_code().await
    }

    /// Graceful-then-forceful shutdown: sends EOF on stdin and waits `grace`
    /// before escalating to a hard kill, matching the orchestrator's 3 s
    /// deadline-expiry handling.
    pub async fn terminate(&self, grace: Duration) -> Result<()> {
        info!(%self.agent_id, "terminating agent session");
        if self.handle.terminate_gracefully(grace).await? {
            return Ok(());
        }
        self.handle.kill().await
    }

    pub fn kind(&self) -> AgentKind {
        self.adapter.kind()
    }

    pub fn binary_name(&self) -> &str {
        self.adapter.binary_name()
    }

    pub fn handle_id(&self) -> Uuid {
        self.handle.id
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("agent_id", &self.agent_id)
            .field("handle_id", &self.handle.id)
            .field("cli", &self.adapter.binary_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// A test-only adapter that shells out to `/bin/sh` so these tests don't
    /// depend on any real coding-agent CLI being installed.
    struct ShAdapter;

    #[async_trait]
    impl CliAdapter for ShAdapter {
        fn kind(&self) -> AgentKind {
            AgentKind::Local
        }

        fn binary_name(&self) -> &str {
            "/bin/sh"
        }

        fn default_args(&self) -> Vec<String> {
            vec![]
        }

        async fn spawn(
            &self,
            pool: &ProcessPool,
            task: &str,
            workdir: &str,
            env: &[(&str, &str)],
        ) -> Result<ProcessHandle> {
            pool.spawn("/bin/sh", &["-c", task], workdir, env).await
        }
    }

    async fn spawn_sh_session(agent_id: Uuid, pool: &ProcessPool, script: &str) -> AgentSession {
        let adapter: Box<dyn CliAdapter> = Box::new(ShAdapter);
        let handle = adapter.spawn(pool, script, ".", &[]).await.unwrap();
        AgentSession { agent_id, handle, adapter }
    }

    #[tokio::test]
    async fn check_termination_sees_done_marker() {
        let pool = ProcessPool::new(4);
        let session = spawn_sh_session(Uuid::new_v4(), &pool, "echo DONE").await;

        let line = session.handle.stdout.recv_async().await.unwrap();
        assert_eq!(line, "DONE");
        let reason = session.check_termination(&line).await;
        assert_eq!(reason, Some(TerminationReason::DoneMarker));
    }

    #[tokio::test]
    async fn check_termination_falls_back_to_end_of_stream() {
        let pool = ProcessPool::new(4);
        let session = spawn_sh_session(Uuid::new_v4(), &pool, "echo still-running").await;

        let line = session.handle.stdout.recv_async().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let reason = session.check_termination(&line).await;
        assert_eq!(reason, Some(TerminationReason::EndOfStream));
    }

    #[tokio::test]
    async fn terminate_kills_a_long_running_process() {
        let pool = ProcessPool::new(4);
        let session = spawn_sh_session(Uuid::new_v4(), &pool, "sleep 30").await;
        assert!(session.is_alive().await);

        session.terminate(Duration::from_millis(100)).await.unwrap();
        assert!(!session.is_alive().await);
    }
}
