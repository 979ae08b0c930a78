//! Daily driver — the third subphase of each heartbeat tick, run once per
//! calendar day: retries blocked cards past their retry window, sweeps
//! stale worktrees, drafts PRs for merge-verified cards, and summarises the
//! day's audit log as a digest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use awc_core::config::{Constraints, Toggles};
use awc_core::error::CoreError;
use awc_core::store::Store;
use awc_core::types::{AgentStatus, KanbanCard, VerificationStatus};
use awc_core::worktree_manager::WorktreeManager;
use awc_queue::WorkQueue;

/// Worktrees untouched this long are considered abandoned and removed.
const STALE_WORKTREE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Seam to draft-PR preparation so this crate doesn't hard-depend on the
/// GitHub integration crate before it's wired up. A real implementation
/// posts through `awc-integrations::github::pull_requests`.
#[async_trait]
pub trait DraftPrPreparer: Send + Sync {
    async fn prepare(&self, card: &KanbanCard, branch_name: &str) -> bool;
}

/// Stands in until the GitHub integration is wired; never drafts anything.
pub struct NoOpDraftPrPreparer;

#[async_trait]
impl DraftPrPreparer for NoOpDraftPrPreparer {
    async fn prepare(&self, _card: &KanbanCard, _branch_name: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DailyReport {
    pub worktrees_cleaned: u32,
    pub cards_retried: u32,
    pub prs_drafted: u32,
    pub digest_entries: u32,
}

/// Once-a-day housekeeping: retries, worktree GC, draft PRs, digest.
pub struct Daily {
    store: Arc<Store>,
    queue: Arc<WorkQueue>,
    worktrees: Arc<WorktreeManager>,
    draft_pr: Arc<dyn DraftPrPreparer>,
}

impl Daily {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<WorkQueue>,
        worktrees: Arc<WorktreeManager>,
        draft_pr: Arc<dyn DraftPrPreparer>,
    ) -> Self {
        Self {
            store,
            queue,
            worktrees,
            draft_pr,
        }
    }

    pub async fn run(
        &self,
        toggles: &Toggles,
        constraints: &Constraints,
        digest_since: DateTime<Utc>,
    ) -> Result<DailyReport, CoreError> {
        let mut report = DailyReport::default();

        if toggles.clean_worktrees {
            let removed = self
                .worktrees
                .cleanup_stale(STALE_WORKTREE_MAX_AGE)
                .await
                .map_err(|e| CoreError::External(e.to_string()))?;
            report.worktrees_cleaned = removed.len() as u32;
            if report.worktrees_cleaned > 0 {
                info!(count = report.worktrees_cleaned, "cleaned up stale worktrees");
            }
        }

        if toggles.retry_blocked {
            report.cards_retried = self.retry_blocked_cards(constraints).await?;
        }

        if toggles.draft_prs {
            report.prs_drafted = self.draft_merge_verified_prs().await?;
        }

        if toggles.send_digest {
            let entries = self.store.audit_since(digest_since).await?;
            report.digest_entries = entries.len() as u32;
            info!(entries = report.digest_entries, since = %digest_since, "daily digest summarised");
        }

        Ok(report)
    }

    async fn retry_blocked_cards(&self, constraints: &Constraints) -> Result<u32, CoreError> {
        let retry_after = chrono::Duration::minutes(i64::from(constraints.blocked_retry_minutes));
        let now = Utc::now();
        let mut retried = 0u32;

        for project in self.store.list_projects().await? {
            for card in self.store.list_cards_by_project(project.id).await? {
                if card.agent_status != Some(AgentStatus::Blocked) {
                    continue;
                }
                if now.signed_duration_since(card.updated_at) < retry_after {
                    continue;
                }
                self.queue.resume(card.id).await?;
                retried += 1;
            }
        }
        Ok(retried)
    }

    async fn draft_merge_verified_prs(&self) -> Result<u32, CoreError> {
        let mut drafted = 0u32;
        for project in self.store.list_projects().await? {
            for card in self.store.list_cards_by_project(project.id).await? {
                if card.verification_status != Some(VerificationStatus::MergeVerified) {
                    continue;
                }
                let branch = self.worktrees.branch_name(&card);
                if self.draft_pr.prepare(&card, &branch).await {
                    drafted += 1;
                }
            }
        }
        Ok(drafted)
    }
}
