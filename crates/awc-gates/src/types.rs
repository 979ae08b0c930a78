//! Transient result types shared across the gate pipeline. None of these
//! are persisted as their own table — only via the audit log and the
//! card's `verificationStatus` (see `awc-queue`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Branch,
    Merge,
}

/// Output of one external command (type-check, lint, test, build) run
/// under a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn passed(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// The static-check trio (Gate 1 / Gate 2 both run this) plus its overall
/// verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub card_id: uuid::Uuid,
    pub gate: Gate,
    pub passed: bool,
    pub tsc_output: CommandOutput,
    pub lint_output: CommandOutput,
    pub test_output: CommandOutput,
    pub timestamp: DateTime<Utc>,
    pub branch_name: String,
}

impl VerificationResult {
    pub fn new(
        card_id: uuid::Uuid,
        gate: Gate,
        branch_name: impl Into<String>,
        tsc_output: CommandOutput,
        lint_output: CommandOutput,
        test_output: CommandOutput,
    ) -> Self {
        let passed = tsc_output.passed() && lint_output.passed() && test_output.passed();
        Self {
            card_id,
            gate,
            passed,
            tsc_output,
            lint_output,
            test_output,
            timestamp: Utc::now(),
            branch_name: branch_name.into(),
        }
    }
}

/// Snapshot of codebase health, seeding a campaign baseline and feeding
/// report deltas on each heartbeat tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CodebaseMetrics {
    pub lint_warning_count: u32,
    pub lint_error_count: u32,
    pub any_type_escapes: u32,
    pub test_file_count: u32,
    pub source_file_count: u32,
}

impl CodebaseMetrics {
    /// Difference of `self` (current) against `baseline`, positive meaning
    /// a regression for the count-of-bad-things fields.
    pub fn delta(&self, baseline: &CodebaseMetrics) -> CodebaseMetrics {
        CodebaseMetrics {
            lint_warning_count: self.lint_warning_count.saturating_sub(baseline.lint_warning_count),
            lint_error_count: self.lint_error_count.saturating_sub(baseline.lint_error_count),
            any_type_escapes: self.any_type_escapes.saturating_sub(baseline.any_type_escapes),
            test_file_count: self.test_file_count.saturating_sub(baseline.test_file_count),
            source_file_count: self.source_file_count.saturating_sub(baseline.source_file_count),
        }
    }
}
