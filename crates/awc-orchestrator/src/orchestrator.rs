//! Turns a queued card into a running agent subprocess: obtains an isolated
//! worktree, spawns the chosen CLI adapter, streams its output through a
//! bounded ring buffer, enforces the wall-clock deadline, and persists the
//! post-run decision back onto the card.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use awc_core::error::CoreError;
use awc_core::types::{AgentStatus, AuditEntry, KanbanCard, Project, VerificationStatus};
use awc_core::worktree_manager::WorktreeManager;
use awc_gates::types::{CommandOutput, Gate, VerificationResult};
use awc_queue::WorkQueue;
use awc_session::cli_adapter::AgentKind;
use awc_session::process_pool::{ProcessPool, StreamSource};
use awc_session::session::{AgentSession, TerminationReason};

use crate::state_machine::{AgentEvent, AgentStateMachine};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Hard ceiling on a run's wall-clock deadline, regardless of a project's
/// own `agentTimeoutMinutes` setting.
const HARD_DEADLINE_MINUTES: u32 = 30;

/// How long a run is given to exit gracefully after its deadline (or a
/// done-marker miss) before the orchestrator escalates to a hard kill.
const GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Default bound on the per-card live log ring buffer.
const DEFAULT_RING_CAPACITY: usize = 4_000;

// ---------------------------------------------------------------------------
// Event and gate seams
// ---------------------------------------------------------------------------

/// One line of agent output, tagged with which run and stream it came from.
#[derive(Debug, Clone)]
pub struct AgentLogLine {
    pub card_id: Uuid,
    pub agent_id: Uuid,
    pub stream: StreamSource,
    pub line: String,
}

/// Observer hook the orchestrator publishes through. The event bus
/// implements this over its own channel; tests use [`NullEventSink`].
pub trait EventSink: Send + Sync {
    fn agent_spawned(&self, _card_id: Uuid, _agent_id: Uuid) {}
    fn agent_log(&self, _line: AgentLogLine) {}
    fn agent_completed(&self, _card_id: Uuid, _outcome: &RunOutcome) {}
    fn agent_failed(&self, _card_id: Uuid, _reason: &str) {}
}

pub struct NullEventSink;
impl EventSink for NullEventSink {}

/// Seam to the gate pipeline so the orchestrator can trigger Gate 1 on a
/// successful run and get back the full verification result to persist.
#[async_trait::async_trait]
pub trait GateRunner: Send + Sync {
    async fn run_gate_one(&self, card_id: Uuid, workdir: &str) -> VerificationResult;
}

/// Accepts every run unconditionally; used where no gate pipeline is wired
/// in yet (tests, early bring-up).
pub struct AcceptAllGates;

#[async_trait::async_trait]
impl GateRunner for AcceptAllGates {
    async fn run_gate_one(&self, card_id: Uuid, workdir: &str) -> VerificationResult {
        let ok = CommandOutput {
            command: "true".to_string(),
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        };
        VerificationResult::new(card_id, Gate::Branch, workdir, ok.clone(), ok.clone(), ok)
    }
}

// ---------------------------------------------------------------------------
// Workspace path guard
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("path escapes workspace: {0}")]
pub struct PathEscapeError(String);

/// Rejects any path an agent claims to touch that is absolute or escapes
/// the workspace root via `..`, per the orchestrator's isolation contract.
pub fn guard_workspace_path(candidate: &str) -> std::result::Result<(), PathEscapeError> {
    let path = std::path::Path::new(candidate);
    if path.is_absolute() {
        return Err(PathEscapeError(candidate.to_string()));
    }
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(PathEscapeError(candidate.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub agent_id: Uuid,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub termination: Option<TerminationReason>,
    pub log_tail: Vec<String>,
    pub branch_name: String,
    pub worktree_path: String,
}

// ---------------------------------------------------------------------------
// AgentOrchestrator
// ---------------------------------------------------------------------------

pub struct AgentOrchestrator {
    pool: Arc<ProcessPool>,
    worktrees: Arc<WorktreeManager>,
    queue: Arc<WorkQueue>,
    sink: Arc<dyn EventSink>,
    gates: Arc<dyn GateRunner>,
    ring_capacity: usize,
    running_per_project: Mutex<HashMap<Uuid, u32>>,
}

impl AgentOrchestrator {
    pub fn new(
        pool: Arc<ProcessPool>,
        worktrees: Arc<WorktreeManager>,
        queue: Arc<WorkQueue>,
        sink: Arc<dyn EventSink>,
        gates: Arc<dyn GateRunner>,
    ) -> Self {
        Self {
            pool,
            worktrees,
            queue,
            sink,
            gates,
            ring_capacity: DEFAULT_RING_CAPACITY,
            running_per_project: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    pub async fn running_count(&self, project_id: Uuid) -> u32 {
        *self
            .running_per_project
            .lock()
            .await
            .get(&project_id)
            .unwrap_or(&0)
    }

    async fn reserve_slot(&self, project: &Project) -> Result<()> {
        let mut counts = self.running_per_project.lock().await;
        let count = counts.entry(project.id).or_insert(0);
        let cap = project.concurrency_cap().min(self.pool.max_processes() as u32);
        if *count >= cap {
            return Err(CoreError::Busy(format!(
                "project {} already has {count} agent(s) running (cap {cap})",
                project.id
            )));
        }
        *count += 1;
        Ok(())
    }

    async fn release_slot(&self, project_id: Uuid) {
        let mut counts = self.running_per_project.lock().await;
        if let Some(count) = counts.get_mut(&project_id) {
            *count = count.saturating_sub(1);
        }
    }

    /// Spawns an agent for `card`, runs it to completion or deadline, and
    /// persists the resulting transitions on the card. Returns `Busy` if
    /// the project is already at its concurrency cap.
    pub async fn spawn_agent(
        &self,
        project: &Project,
        card: &KanbanCard,
        kind: AgentKind,
        env: &[(&str, &str)],
    ) -> Result<RunOutcome> {
        self.reserve_slot(project).await?;
        let result = self.run(project, card, kind, env).await;
        self.release_slot(project.id).await;

        match &result {
            Ok(outcome) => self.sink.agent_completed(card.id, outcome),
            Err(e) => self.sink.agent_failed(card.id, &e.to_string()),
        }
        result
    }

    async fn run(
        &self,
        project: &Project,
        card: &KanbanCard,
        kind: AgentKind,
        env: &[(&str, &str)],
    ) -> Result<RunOutcome> {
        let mut sm = AgentStateMachine::new();
        sm.transition(AgentEvent::Start).ok();

        self.queue.start_work(card.id).await?;

        let worktree = self
            .worktrees
            .create_for_card(card)
            .await
            .map_err(|e| CoreError::External(e.to_string()))?;

        let agent_id = Uuid::new_v4();
        let task = card.context_snapshot.clone().unwrap_or_else(|| card.description.clone());
        let session = match AgentSession::spawn(&self.pool, agent_id, kind, &task, &worktree.path, env).await {
            Ok(session) => session,
            Err(e) => {
                sm.transition(AgentEvent::Fail).ok();
                return Err(CoreError::External(e.to_string()));
            }
        };
        sm.transition(AgentEvent::Spawned).ok();

        info!(card_id = %card.id, %agent_id, cli = session.binary_name(), "agent spawned");
        self.sink.agent_spawned(card.id, agent_id);

        let deadline = Duration::from_secs(
            (project.agent_deadline().as_secs()).min(u64::from(HARD_DEADLINE_MINUTES) * 60),
        );
        let started = Instant::now();
        let mut ring: VecDeque<String> = VecDeque::with_capacity(self.ring_capacity.min(256));
        let mut termination = None;
        let mut timed_out = false;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= deadline {
                warn!(card_id = %card.id, %agent_id, "agent deadline expired");
                timed_out = true;
                session.terminate(GRACE_PERIOD).await.ok();
                break;
            }

            let poll_window = (deadline - elapsed).min(Duration::from_millis(500));
            match session.read_line_timeout(poll_window).await {
                Some((stream, line)) => {
                    if ring.len() >= self.ring_capacity {
                        ring.pop_front();
                    }
                    ring.push_back(line.clone());
                    self.sink.agent_log(AgentLogLine {
                        card_id: card.id,
                        agent_id,
                        stream,
                        line: line.clone(),
                    });
                    if let Some(reason) = session.check_termination(&line).await {
                        termination = Some(reason);
                        break;
                    }
                }
                None => {
                    if !session.is_alive().await {
                        termination = Some(TerminationReason::EndOfStream);
                        break;
                    }
                }
            }
        }

        let exit_code = session.exit_code().await;
        self.pool.release(session.handle_id()).await;

        let actionable_change = self
            .worktrees
            .has_changes(&worktree.path)
            .await
            .unwrap_or(false);
        let success = !timed_out
            && exit_code == Some(0)
            && matches!(termination, Some(TerminationReason::DoneMarker))
            && actionable_change;

        let outcome = RunOutcome {
            agent_id,
            success,
            exit_code,
            timed_out,
            termination,
            log_tail: ring.into_iter().collect(),
            branch_name: worktree.branch,
            worktree_path: worktree.path,
        };

        sm.transition(AgentEvent::Stop).ok();
        if success {
            sm.transition(AgentEvent::Stop).ok();
            self.queue.complete_work(card.id).await?;

            let gate_result = self.gates.run_gate_one(card.id, &outcome.worktree_path).await;
            if gate_result.passed {
                self.queue
                    .set_verification_status(card.id, VerificationStatus::BranchVerified, None)
                    .await?;
                info!(card_id = %card.id, %agent_id, "gate 1 passed, card branch-verified");
            } else {
                self.queue
                    .set_verification_status(
                        card.id,
                        VerificationStatus::BranchFailed,
                        Some("gate 1 failed".to_string()),
                    )
                    .await?;
                self.queue
                    .record_audit(&AuditEntry::new(
                        "card",
                        card.id.to_string(),
                        "gate1_failed",
                        "orchestrator",
                        serde_json::json!({
                            "tsc_passed": gate_result.tsc_output.passed(),
                            "lint_passed": gate_result.lint_output.passed(),
                            "test_passed": gate_result.test_output.passed(),
                        }),
                    ))
                    .await?;
                warn!(card_id = %card.id, %agent_id, "gate 1 failed");
            }
        } else {
            sm.transition(AgentEvent::Fail).ok();
            let reason = if timed_out {
                "agent deadline expired (timeout)".to_string()
            } else {
                "agent exited without a verified completion".to_string()
            };
            warn!(card_id = %card.id, %agent_id, reason = %reason, "agent run did not succeed");
            self.queue
                .update_agent_status(card.id, AgentStatus::Failed, Some(reason))
                .await?;
            self.queue
                .set_verification_status(card.id, VerificationStatus::BranchFailed, None)
                .await?;
        }

        Ok(outcome)
    }
}
