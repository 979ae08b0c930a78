use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use awc_core::config::{Constraints, Toggles};
use awc_core::error::CoreError;
use awc_core::store::Store;
use awc_core::types::{AgentStatus, AuditEntry, Column, KanbanCard, VerificationStatus};

use crate::board::Board;
use crate::selection::select_next;

/// Service-layer facade over the persistence core's card CRUD: enforces the
/// card lifecycle state machine, position tie-breaking, and the `getNext`
/// priority-selection algorithm. Holds no state of its own beyond the store
/// handle, so it's cheap to clone and share across the drivers and the bus.
#[derive(Clone)]
pub struct WorkQueue {
    store: Arc<Store>,
}

impl WorkQueue {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn get_board(&self, project_id: Uuid) -> Result<Board, CoreError> {
        let cards = self.store.list_cards_by_project(project_id).await?;
        Ok(Board::from_cards(cards))
    }

    /// Inserts a new card, appending it to the back of the backlog.
    pub async fn create_card(&self, mut card: KanbanCard) -> Result<KanbanCard, CoreError> {
        if card.title.trim().is_empty() {
            return Err(CoreError::Validation("card title must not be empty".into()));
        }
        card.position = self.next_position(card.project_id, Column::Backlog).await?;
        self.store.create_card(&card).await?;
        Ok(card)
    }

    pub async fn update_card(
        &self,
        card: &KanbanCard,
        if_updated_at: Option<DateTime<Utc>>,
    ) -> Result<KanbanCard, CoreError> {
        self.store.update_card(card, if_updated_at).await
    }

    pub async fn delete_card(&self, id: Uuid) -> Result<(), CoreError> {
        self.store.delete_card(id).await
    }

    /// Moves a card to a new column, appending it to the back (max
    /// position + 1 within the destination column).
    pub async fn move_card(&self, card_id: Uuid, column: Column) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.position = self.next_position(card.project_id, column).await?;
        card.column = column;
        self.store.update_card(&card, None).await
    }

    /// Sets the card's position to the back of the backlog without
    /// changing its column — used to defer a card the builder keeps
    /// picking but that isn't ready to run.
    pub async fn skip_to_back(&self, card_id: Uuid) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.position = self.next_position(card.project_id, Column::Backlog).await?;
        self.store.update_card(&card, None).await
    }

    pub async fn save_context(
        &self,
        card_id: Uuid,
        snapshot: String,
        session_id: Option<Uuid>,
    ) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.context_snapshot = Some(snapshot);
        if let Some(session_id) = session_id {
            card.last_session_id = Some(session_id);
        }
        self.store.update_card(&card, None).await
    }

    pub async fn assign_agent(&self, card_id: Uuid, agent: impl Into<String>) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.assigned_agent = Some(agent.into());
        card.agent_status = Some(AgentStatus::Idle);
        self.store.update_card(&card, None).await
    }

    pub async fn update_agent_status(
        &self,
        card_id: Uuid,
        status: AgentStatus,
        reason: Option<String>,
    ) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.agent_status = Some(status);
        card.blocked_reason = reason;
        self.store.update_card(&card, None).await
    }

    /// Sets the card's post-run verification outcome, optionally attaching
    /// a reason (e.g. why Gate 1 failed, or that a deadline expired).
    pub async fn set_verification_status(
        &self,
        card_id: Uuid,
        status: VerificationStatus,
        reason: Option<String>,
    ) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.verification_status = Some(status);
        if reason.is_some() {
            card.blocked_reason = reason;
        }
        self.store.update_card(&card, None).await
    }

    /// Passes an audit entry straight through to the persistence core, so
    /// callers that only hold a `WorkQueue` (not a `Store`) can still log.
    pub async fn record_audit(&self, entry: &AuditEntry) -> Result<(), CoreError> {
        self.store.record_audit(entry).await
    }

    /// `backlog -> in_progress[running]`. The only column transition the
    /// queue performs on the way in.
    pub async fn start_work(&self, card_id: Uuid) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        if card.assigned_agent.is_none() {
            return Err(CoreError::Validation(format!(
                "card {card_id} cannot start work without an assigned agent"
            )));
        }
        card.column = Column::InProgress;
        card.agent_status = Some(AgentStatus::Running);
        card.started_at = Some(Utc::now());
        card.position = self.next_position(card.project_id, Column::InProgress).await?;
        info!(card_id = %card_id, "card started");
        self.store.update_card(&card, None).await
    }

    /// `in_progress[running] -> done`. The only column transition the queue
    /// performs on the way out.
    pub async fn complete_work(&self, card_id: Uuid) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        card.column = Column::Done;
        card.agent_status = Some(AgentStatus::Completed);
        card.completed_at = Some(Utc::now());
        card.position = self.next_position(card.project_id, Column::Done).await?;
        info!(card_id = %card_id, "card completed");
        self.store.update_card(&card, None).await
    }

    /// Clears a `blocked` status and returns the card to `running` so the
    /// orchestrator can retry it. Does not change column or position.
    pub async fn resume(&self, card_id: Uuid) -> Result<KanbanCard, CoreError> {
        let mut card = self.require_card(card_id).await?;
        if card.agent_status != Some(AgentStatus::Blocked) {
            warn!(card_id = %card_id, "resume called on a non-blocked card");
        }
        card.agent_status = Some(AgentStatus::Running);
        card.blocked_reason = None;
        self.store.update_card(&card, None).await
    }

    /// The §4.2 `getNext` priority-selection algorithm, scoped to one
    /// project's backlog and honouring the checklist-driven toggles.
    pub async fn get_next(
        &self,
        project_id: Uuid,
        toggles: &Toggles,
        constraints: &Constraints,
    ) -> Result<Option<KanbanCard>, CoreError> {
        let backlog = self.store.list_cards_by_column(project_id, Column::Backlog).await?;
        Ok(select_next(&backlog, toggles, constraints, Utc::now()))
    }

    /// Cards whose branch passed Gate 1 and are awaiting the synthesizer's
    /// merge attempt, ordered by priority for the merge loop in §4.5.
    pub async fn merge_candidates(&self, project_id: Uuid) -> Result<Vec<KanbanCard>, CoreError> {
        let mut cards: Vec<_> = self
            .store
            .list_cards_by_project(project_id)
            .await?
            .into_iter()
            .filter(|c| c.verification_status == Some(VerificationStatus::BranchVerified))
            .collect();
        cards.sort_by_key(|c| (-c.priority, c.position, c.created_at));
        Ok(cards)
    }

    async fn require_card(&self, card_id: Uuid) -> Result<KanbanCard, CoreError> {
        self.store
            .get_card(card_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("card {card_id}")))
    }

    async fn next_position(&self, project_id: Uuid, column: Column) -> Result<i32, CoreError> {
        let existing = self.store.list_cards_by_column(project_id, column).await?;
        Ok(existing.iter().map(|c| c.position).max().map_or(0, |m| m + 1))
    }
}
