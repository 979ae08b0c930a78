//! The gate pipeline: the series of checks a card's work passes through
//! between "agent finished" and "merged into the integration branch".
//!
//! - [`gate0`] — preflight before an agent is ever spawned
//! - [`gate1`] / [`gate2`] — static checks on the branch, then again on merge
//! - [`gate_smoke`] — behavioural smoke test against a running instance
//! - [`runner`] — the shared deadline-bounded command runner every gate uses
//! - [`metrics`] — codebase health snapshots for campaign baselines/deltas
//! - [`types`] — the result types gates produce

pub mod gate0;
pub mod gate1;
pub mod gate2;
pub mod gate_smoke;
pub mod metrics;
pub mod runner;
pub mod types;

pub use gate0::{run_gate0, Gate0Result};
pub use gate1::{run_static_checks, StaticCheckCommands, DEFAULT_COMMAND_DEADLINE};
pub use gate2::run_gate2;
pub use gate_smoke::{run_gate_smoke, GateSResult, ScriptedCall, SmokeScript, HEALTH_CHECK_TIMEOUT, TEARDOWN_GRACE};
pub use runner::run_with_deadline;
pub use types::{CodebaseMetrics, CommandOutput, Gate, VerificationResult};
