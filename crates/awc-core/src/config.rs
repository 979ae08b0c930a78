use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Typed configuration, resolved environment-first, falling back to
/// checked-in defaults. Runtime toggles here are the baseline the
/// `HEARTBEAT.md` checklist (see [`crate::checklist`]) overrides at the
/// start of every heartbeat tick — secrets (`bearer_token`) are never
/// touched by the checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    #[serde(skip_serializing)]
    pub bearer_token: String,
    #[serde(default)]
    pub gates: GateTimeouts,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub toggles: Toggles,
}

impl Config {
    /// Resolve configuration from the process environment, falling back to
    /// defaults for anything unset. `AWC_BEARER_TOKEN` is required — there is
    /// no safe default for a secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("AWC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let port = match std::env::var("AWC_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::Parse(format!("AWC_PORT: {e}")))?,
            Err(_) => default_port(),
        };

        let bearer_token = std::env::var("AWC_BEARER_TOKEN")
            .map_err(|_| ConfigError::MissingSecret("AWC_BEARER_TOKEN".into()))?;

        Ok(Self {
            data_dir,
            port,
            bearer_token,
            gates: GateTimeouts::default(),
            constraints: Constraints::default(),
            toggles: Toggles::default(),
        })
    }

    /// A config suitable for tests and the behavioural-smoke harness: an
    /// isolated temp data dir, a free high port, a throwaway bearer token.
    pub fn for_smoke_test(data_dir: PathBuf, port: u16) -> Self {
        Self {
            data_dir,
            port,
            bearer_token: "smoke-test-token".into(),
            gates: GateTimeouts::default(),
            constraints: Constraints::default(),
            toggles: Toggles::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".awc")
}

fn default_port() -> u16 {
    9876
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required secret: {0}")]
    MissingSecret(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<ConfigError> for crate::error::CoreError {
    fn from(e: ConfigError) -> Self {
        crate::error::CoreError::Validation(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Gate timeouts — spec §5's timeout table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateTimeouts {
    #[serde(default = "default_per_command_secs")]
    pub per_command_secs: u64,
    #[serde(default = "default_agent_wall_minutes")]
    pub agent_wall_minutes: u64,
    #[serde(default = "default_http_request_secs")]
    pub http_request_secs: u64,
    #[serde(default = "default_smoke_startup_secs")]
    pub smoke_startup_secs: u64,
    #[serde(default = "default_ping_secs")]
    pub ping_secs: u64,
}

impl Default for GateTimeouts {
    fn default() -> Self {
        Self {
            per_command_secs: default_per_command_secs(),
            agent_wall_minutes: default_agent_wall_minutes(),
            http_request_secs: default_http_request_secs(),
            smoke_startup_secs: default_smoke_startup_secs(),
            ping_secs: default_ping_secs(),
        }
    }
}

fn default_per_command_secs() -> u64 {
    120
}
fn default_agent_wall_minutes() -> u64 {
    30
}
fn default_http_request_secs() -> u64 {
    30
}
fn default_smoke_startup_secs() -> u64 {
    30
}
fn default_ping_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Constraints — concurrency caps and retry windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default = "default_max_concurrent_agents")]
    pub max_concurrent_agents: u32,
    #[serde(default = "default_blocked_retry_minutes")]
    pub blocked_retry_minutes: u32,
    #[serde(default)]
    pub skip_large_context: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_concurrent_agents: default_max_concurrent_agents(),
            blocked_retry_minutes: default_blocked_retry_minutes(),
            skip_large_context: false,
        }
    }
}

fn default_max_concurrent_agents() -> u32 {
    3
}
fn default_blocked_retry_minutes() -> u32 {
    15
}

// ---------------------------------------------------------------------------
// Toggles — driver behaviour, overridable by HEARTBEAT.md
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toggles {
    #[serde(default = "default_true")]
    pub process_backlog: bool,
    #[serde(default = "default_true")]
    pub retry_blocked: bool,
    #[serde(default)]
    pub skip_interactive_only: bool,
    #[serde(default = "default_true")]
    pub merge_verified: bool,
    #[serde(default = "default_true")]
    pub collect_metrics: bool,
    #[serde(default)]
    pub cross_project_synthesis: bool,
    #[serde(default)]
    pub draft_prs: bool,
    #[serde(default = "default_true")]
    pub send_digest: bool,
    #[serde(default = "default_true")]
    pub clean_worktrees: bool,
    #[serde(default)]
    pub notifications: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            process_backlog: true,
            retry_blocked: true,
            skip_interactive_only: false,
            merge_verified: true,
            collect_metrics: true,
            cross_project_synthesis: false,
            draft_prs: false,
            send_digest: true,
            clean_worktrees: true,
            notifications: false,
        }
    }
}

fn default_true() -> bool {
    true
}
