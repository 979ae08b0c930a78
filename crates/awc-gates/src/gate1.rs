//! Gate 1 / Gate 2 — static checks on a worktree: type-check, lint, and
//! unit tests, each under its own deadline. Gate 2 runs the identical
//! procedure against the merge result, so both share this module.

use std::time::Duration;

use uuid::Uuid;

use crate::runner::run_with_deadline;
use crate::types::{Gate, VerificationResult};

/// Default per-command deadline for the static checks (spec default: 120s).
pub const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(120);

/// The three shell commands a project configures for its static checks.
#[derive(Debug, Clone)]
pub struct StaticCheckCommands {
    pub typecheck: String,
    pub lint: String,
    pub test: String,
}

/// Runs the type-check, lint, and test commands against `workdir`,
/// producing a [`VerificationResult`] tagged with `gate`.
pub async fn run_static_checks(
    card_id: Uuid,
    gate: Gate,
    workdir: &str,
    branch_name: &str,
    commands: &StaticCheckCommands,
    deadline: Duration,
) -> VerificationResult {
    let tsc = run_with_deadline(&commands.typecheck, workdir, deadline, &[]).await;
    let lint = run_with_deadline(&commands.lint, workdir, deadline, &[]).await;
    let test = run_with_deadline(&commands.test, workdir, deadline, &[]).await;
    VerificationResult::new(card_id, gate, branch_name, tsc, lint, test)
}
