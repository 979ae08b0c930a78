//! Synthesizer driver — the second subphase of each heartbeat tick: merges
//! branch-verified cards back into the integration branch, re-runs Gate 2,
//! and folds the resulting codebase metrics into the audit log.

use std::sync::Arc;
use std::time::Duration;

use awc_core::config::Toggles;
use awc_core::error::CoreError;
use awc_core::store::Store;
use awc_core::types::{AuditEntry, KanbanCard, VerificationStatus};
use awc_core::worktree::WorktreeInfo;
use awc_core::worktree_manager::{MergeResult, WorktreeManager};
use awc_gates::gate1::StaticCheckCommands;
use awc_gates::{metrics, run_gate2, CodebaseMetrics};
use awc_queue::WorkQueue;
use chrono::Utc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesizerReport {
    pub merge_attempts: u32,
    pub merged: u32,
    pub conflicts: u32,
    pub gate2_failures: u32,
}

/// Drives branch-verified cards through merge and post-merge regression
/// re-verification (Gate 2), one project at a time in priority order.
pub struct Synthesizer {
    store: Arc<Store>,
    queue: Arc<WorkQueue>,
    worktrees: Arc<WorktreeManager>,
    commands: StaticCheckCommands,
}

impl Synthesizer {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<WorkQueue>,
        worktrees: Arc<WorktreeManager>,
        commands: StaticCheckCommands,
    ) -> Self {
        Self {
            store,
            queue,
            worktrees,
            commands,
        }
    }

    pub async fn run(
        &self,
        toggles: &Toggles,
        gate_deadline: Duration,
    ) -> Result<SynthesizerReport, CoreError> {
        let mut report = SynthesizerReport::default();
        if !toggles.merge_verified {
            return Ok(report);
        }

        let projects = self.store.list_projects().await?;
        for project in projects {
            let candidates = self.queue.merge_candidates(project.id).await?;
            for card in candidates {
                report.merge_attempts += 1;
                self.merge_one(&card, gate_deadline, toggles, &mut report).await?;
            }
        }
        Ok(report)
    }

    async fn merge_one(
        &self,
        card: &KanbanCard,
        gate_deadline: Duration,
        toggles: &Toggles,
        report: &mut SynthesizerReport,
    ) -> Result<(), CoreError> {
        let branch = self.worktrees.branch_name(card);
        let worktree_path = self.worktrees.worktree_path(card);
        let worktree = WorktreeInfo {
            path: worktree_path.display().to_string(),
            branch: branch.clone(),
            base_branch: "main".to_string(),
            card_name: branch.trim_start_matches("card/").to_string(),
            created_at: Utc::now(),
        };

        let merge_result = self
            .worktrees
            .merge_to_main(&worktree)
            .await
            .map_err(|e| CoreError::External(e.to_string()))?;

        match merge_result {
            MergeResult::NothingToMerge => {
                warn!(card_id = %card.id, "merge candidate had nothing to merge");
                Ok(())
            }
            MergeResult::Conflict(files) => {
                report.conflicts += 1;
                self.mark_merge_failed(card, &format!("merge conflict in {files:?}")).await
            }
            MergeResult::Success => {
                let repo = self.worktrees.repo_path();
                let gate2 = run_gate2(
                    card.id,
                    repo.workdir().to_str().unwrap_or("."),
                    &branch,
                    &self.commands,
                    gate_deadline,
                )
                .await;

                if !gate2.passed {
                    report.gate2_failures += 1;
                    return self.mark_merge_failed(card, "gate 2 failed post-merge").await;
                }

                if toggles.collect_metrics {
                    let current = metrics::harvest(repo.workdir(), &gate2.lint_output);
                    self.record_metrics(card, &current).await;
                }

                report.merged += 1;
                self.mark_merge_verified(card).await
            }
        }
    }

    async fn mark_merge_verified(&self, card: &KanbanCard) -> Result<(), CoreError> {
        let mut updated = card.clone();
        updated.verification_status = Some(VerificationStatus::MergeVerified);
        self.queue.update_card(&updated, None).await?;
        info!(card_id = %card.id, "card merge-verified");
        Ok(())
    }

    async fn mark_merge_failed(&self, card: &KanbanCard, reason: &str) -> Result<(), CoreError> {
        let mut updated = card.clone();
        updated.verification_status = Some(VerificationStatus::MergeFailed);
        updated.blocked_reason = Some(reason.to_string());
        self.queue.update_card(&updated, None).await?;
        self.store
            .record_audit(&AuditEntry::new(
                "card",
                card.id.to_string(),
                "merge_failed",
                "synthesizer",
                serde_json::json!({ "reason": reason }),
            ))
            .await?;
        warn!(card_id = %card.id, reason, "card merge failed");
        Ok(())
    }

    async fn record_metrics(&self, card: &KanbanCard, current: &CodebaseMetrics) {
        let details = serde_json::json!({
            "lint_warning_count": current.lint_warning_count,
            "lint_error_count": current.lint_error_count,
            "any_type_escapes": current.any_type_escapes,
            "test_file_count": current.test_file_count,
            "source_file_count": current.source_file_count,
        });
        let entry = AuditEntry::new(
            "card",
            card.id.to_string(),
            "metrics_collected",
            "synthesizer",
            details,
        );
        if let Err(e) = self.store.record_audit(&entry).await {
            warn!(card_id = %card.id, error = %e, "failed to record metrics audit entry");
        }
    }
}
