//! Adapter pattern for the coding-agent CLI variants the orchestrator can
//! spawn: each adapter knows its binary name, default flags, and how to
//! recognise the explicit completion marker in its own output.
//!
//! ## Adapters
//!
//! - [`ClaudeAdapter`], [`CodexAdapter`], [`GeminiAdapter`], [`OpenCodeAdapter`]
//! - [`adapter_for()`] is the factory used by the orchestrator

use async_trait::async_trait;

use crate::process_pool::{ProcessHandle, ProcessPool, Result};

/// Which coding-agent CLI (or local-model runner) a card is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Claude,
    Codex,
    Gemini,
    OpenCode,
    /// A locally hosted model, invoked through a configurable runner binary
    /// rather than a vendor CLI.
    Local,
}

/// A running agent's process is considered done once its output contains
/// this literal marker, per the agent protocol's explicit completion
/// signal (the termination detector also treats end-of-stream as done).
pub const DONE_MARKER: &str = "DONE";

#[async_trait]
pub trait CliAdapter: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// The command to execute — must be on `PATH` or an absolute path.
    fn binary_name(&self) -> &str;

    fn default_args(&self) -> Vec<String>;

    /// Spawns the CLI in `workdir` with `task` as its prompt, using `pool`
    /// for process accounting. `env` should already be credential-stripped.
    async fn spawn(
        &self,
        pool: &ProcessPool,
        task: &str,
        workdir: &str,
        env: &[(&str, &str)],
    ) -> Result<ProcessHandle>;

    /// `true` if this line is the adapter's own explicit completion marker.
    fn is_done_marker(&self, line: &str) -> bool {
        line.trim() == DONE_MARKER
    }
}

pub struct ClaudeAdapter;

#[async_trait]
impl CliAdapter for ClaudeAdapter {
    fn kind(&self) -> AgentKind {
        AgentKind::Claude
    }

    fn binary_name(&self) -> &str {
        "claude"
    }

    fn default_args(&self) -> Vec<String> {
        vec!["--dangerously-skip-permissions".into()]
    }

    async fn spawn(
        &self,
        pool: &ProcessPool,
        task: &str,
        workdir: &str,
        env: &[(&str, &str)],
    ) -> Result<ProcessHandle> {
        let args_owned = self.default_args();
        let mut args: Vec<&str> = args_owned.iter().map(|s| s.as_str()).collect();
        args.push("-p");
        args.push(task);
        pool.spawn(self.binary_name(), &args, workdir, env).await
    }
}

pub struct CodexAdapter;

#[async_trait]
impl CliAdapter for CodexAdapter {
    fn kind(&self) -> AgentKind {
        AgentKind::Codex
    }

    fn binary_name(&self) -> &str {
        "codex"
    }

    fn default_args(&self) -> Vec<String> {
        vec!["--approval-mode".into(), "full-auto".into(), "-q".into()]
    }

    async fn spawn(
        &self,
        pool: &ProcessPool,
        task: &str,
        workdir: &str,
        env: &[(&str, &str)],
    ) -> Result<ProcessHandle> {
        let args_owned = self.default_args();
        let mut args: Vec<&str> = args_owned.iter().map(|s| s.as_str()).collect();
        args.push(task);
        pool.spawn(self.binary_name(), &args, workdir, env).await
    }
}

pub struct GeminiAdapter;

#[async_trait]
impl CliAdapter for GeminiAdapter {
    fn kind(&self) -> AgentKind {
        AgentKind::Gemini
    }

    fn binary_name(&self) -> &str {
        "gemini"
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
        let args: Vec<&str> = vec!["-p", task];
        pool.spawn(self.binary_name(), &args, workdir, env).await
    }
}

pub struct OpenCodeAdapter;

#[async_trait]
impl CliAdapter for OpenCodeAdapter {
    fn kind(&self) -> AgentKind {
        AgentKind::OpenCode
    }

    fn binary_name(&self) -> &str {
        "opencode"
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
        let args: Vec<&str> = vec![task];
        pool.spawn(self.binary_name(), &args, workdir, env).await
    }
}

/// A locally hosted model runner, configured via `AWC_LOCAL_MODEL_BIN`
/// (defaulting to `local-agent-runner`) rather than a fixed vendor binary.
pub struct LocalModelAdapter {
    pub runner_binary: String,
}

impl Default for LocalModelAdapter {
    fn default() -> Self {
        Self {
            runner_binary: std::env::var("AWC_LOCAL_MODEL_BIN").unwrap_or_else(|_| "local-agent-runner".into()),
        }
    }
}

#[async_trait]
impl CliAdapter for LocalModelAdapter {
    fn kind(&self) -> AgentKind {
        AgentKind::Local
    }

    fn binary_name(&self) -> &str {
        &self.runner_binary
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
        let args: Vec<&str> = vec!["--task", task];
        pool.spawn(self.binary_name(), &args, workdir, env).await
    }
}

pub fn adapter_for(kind: AgentKind) -> Box<dyn CliAdapter> {
    match kind {
        AgentKind::Claude => Box::new(ClaudeAdapter),
        AgentKind::Codex => Box::new(CodexAdapter),
        AgentKind::Gemini => Box::new(GeminiAdapter),
        AgentKind::OpenCode => Box::new(OpenCodeAdapter),
        AgentKind::Local => Box::new(LocalModelAdapter::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_for_matches_binary_names() {
        assert_eq!(adapter_for(AgentKind::Claude).binary_name(), "claude");
        assert_eq!(adapter_for(AgentKind::Codex).binary_name(), "codex");
        assert_eq!(adapter_for(AgentKind::Gemini).binary_name(), "gemini");
        assert_eq!(adapter_for(AgentKind::OpenCode).binary_name(), "opencode");
    }

    #[test]
    fn done_marker_recognised_regardless_of_adapter() {
        let claude = ClaudeAdapter;
        assert!(claude.is_done_marker("DONE"));
        assert!(claude.is_done_marker("  DONE  "));
        assert!(!claude.is_done_marker("still working"));
    }
}
