//! Builder driver — the first subphase of each heartbeat tick: pulls the
//! highest-priority ready card off each active project's backlog, preflights
//! it through Gate 0, and hands it to the orchestrator to run.

use std::sync::Arc;

use awc_core::config::{Constraints, Toggles};
use awc_core::error::CoreError;
use awc_core::git_read_adapter::default_read_adapter;
use awc_core::store::Store;
use awc_core::types::{KanbanCard, Project, ProjectStatus};
use awc_core::worktree_manager::WorktreeManager;
use awc_gates::run_gate0;
use awc_orchestrator::orchestrator::AgentOrchestrator;
use awc_queue::WorkQueue;
use awc_session::cli_adapter::AgentKind;
use tracing::{info, warn};

/// Name the builder assigns itself when claiming a card — surfaces in the
/// card's `assignedAgent` field and the orchestrator's logs.
const BUILDER_AGENT_NAME: &str = "local-model";

#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderReport {
    pub projects_scanned: u32,
    pub cards_dispatched: u32,
    pub cards_skipped_gate0: u32,
}

/// Picks ready work and fires it at the orchestrator, one card per active
/// project per tick.
pub struct Builder {
    store: Arc<Store>,
    queue: Arc<WorkQueue>,
    worktrees: Arc<WorktreeManager>,
    orchestrator: Arc<AgentOrchestrator>,
}

impl Builder {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<WorkQueue>,
        worktrees: Arc<WorktreeManager>,
        orchestrator: Arc<AgentOrchestrator>,
    ) -> Self {
        Self {
            store,
            queue,
            worktrees,
            orchestrator,
        }
    }

    /// One builder subphase. Dispatched runs are fired via `tokio::spawn`
    /// and not awaited here — a single run may take up to 30 minutes and
    /// must not block the rest of the heartbeat tick.
    pub async fn run(
        &self,
        toggles: &Toggles,
        constraints: &Constraints,
    ) -> Result<BuilderReport, CoreError> {
        let mut report = BuilderReport::default();

        if !toggles.process_backlog {
            return Ok(report);
        }

        let projects = self.store.list_projects().await?;
        for project in projects.into_iter().filter(|p| p.status == ProjectStatus::Active) {
            report.projects_scanned += 1;

            let cap = constraints.max_concurrent_agents.min(project.concurrency_cap());
            if self.orchestrator.running_count(project.id).await >= cap {
                continue;
            }

            let Some(card) = self.queue.get_next(project.id, toggles, constraints).await? else {
                continue;
            };

            if !self.preflight(&card).await {
                self.queue.skip_to_back(card.id).await?;
                report.cards_skipped_gate0 += 1;
                continue;
            }

            self.queue.assign_agent(card.id, BUILDER_AGENT_NAME).await?;
            self.dispatch(project, card);
            report.cards_dispatched += 1;
        }

        Ok(report)
    }

    async fn preflight(&self, card: &KanbanCard) -> bool {
        let workspace_healthy = default_read_adapter()
            .current_branch(self.worktrees.repo_path().workdir().to_str().unwrap_or("."))
            .is_ok();
        // Domain-skill matching lives outside this crate; a card always
        // matches the single local-model skill this build ships with.
        let result = run_gate0(card, false, workspace_healthy, 1);
        if !result.passed {
            warn!(card_id = %card.id, reasons = ?result.reasons, "gate 0 failed, skipping card");
        }
        result.passed
    }

    fn dispatch(&self, project: Project, card: KanbanCard) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            let card_id = card.id;
            match orchestrator.spawn_agent(&project, &card, AgentKind::Local, &[]).await {
                Ok(outcome) => {
                    info!(card_id = %card_id, success = outcome.success, "agent run finished");
                }
                Err(e) => warn!(card_id = %card_id, error = %e, "agent run errored"),
            }
        });
    }
}
