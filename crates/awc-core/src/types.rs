use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub color: Option<String>,
    pub agent_timeout_minutes: Option<u32>,
    pub max_concurrent_agents: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: ProjectStatus::Active,
            color: None,
            agent_timeout_minutes: None,
            max_concurrent_agents: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Wall-clock agent deadline for this project, clamped to the hard ceiling.
    pub fn agent_deadline(&self) -> std::time::Duration {
        let minutes = self.agent_timeout_minutes.unwrap_or(30).min(30);
        std::time::Duration::from_secs(minutes as u64 * 60)
    }

    pub fn concurrency_cap(&self) -> u32 {
        self.max_concurrent_agents.unwrap_or(3)
    }
}

// ---------------------------------------------------------------------------
// ProjectDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Brief,
    Instructions,
    Reference,
    Decisions,
    Assumptions,
    State,
}

impl DocumentType {
    /// System-managed types are unique per project — at most one row each.
    pub fn is_singleton(&self) -> bool {
        matches!(self, DocumentType::Assumptions | DocumentType::State)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub id: Uuid,
    pub project_id: Uuid,
    pub doc_type: DocumentType,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectDocument {
    pub fn new(
        project_id: Uuid,
        doc_type: DocumentType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            doc_type,
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// KanbanCard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Backlog,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Blocked,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    BranchVerified,
    BranchFailed,
    MergeVerified,
    MergeFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanCard {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub column: Column,
    pub labels: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub linked_decision_ids: Vec<Uuid>,
    pub linked_message_ids: Vec<Uuid>,
    pub position: i32,
    pub priority: i32,
    pub context_snapshot: Option<String>,
    pub last_session_id: Option<Uuid>,
    pub assigned_agent: Option<String>,
    pub agent_status: Option<AgentStatus>,
    pub blocked_reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub verification_status: Option<VerificationStatus>,
    pub campaign_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KanbanCard {
    pub fn new(project_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.into(),
            description: description.into(),
            column: Column::Backlog,
            labels: Vec::new(),
            due_date: None,
            linked_decision_ids: Vec::new(),
            linked_message_ids: Vec::new(),
            position: 0,
            priority: 0,
            context_snapshot: None,
            last_session_id: None,
            assigned_agent: None,
            agent_status: None,
            blocked_reason: None,
            started_at: None,
            completed_at: None,
            verification_status: None,
            campaign_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` if `labels` carries the interactive-only tag (see `skipInteractiveOnly`).
    pub fn is_interactive_only(&self) -> bool {
        self.labels.iter().any(|l| l == "agent:interactive")
    }

    /// Checks the invariants local to a single card (cross-card invariants
    /// like position uniqueness live in the queue/store).
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.column == Column::Done && self.completed_at.is_none() {
            return Err("column=done requires completed_at".into());
        }
        if self.agent_status == Some(AgentStatus::Running)
            && (self.started_at.is_none() || self.assigned_agent.is_none())
        {
            return Err("agent_status=running requires started_at and assigned_agent".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub alternatives: Vec<String>,
    pub reasoning: String,
    pub tradeoffs: String,
    pub created_at: DateTime<Utc>,
    pub revised_at: Option<DateTime<Utc>>,
}

impl Decision {
    pub fn new(project_id: Uuid, title: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.into(),
            description: String::new(),
            alternatives: Vec::new(),
            reasoning: reasoning.into(),
            tradeoffs: String::new(),
            created_at: Utc::now(),
            revised_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SteeringCorrection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionDomain {
    CodePattern,
    Communication,
    Architecture,
    Preference,
    Style,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionSource {
    Explicit,
    PrRejection,
    EditDelta,
    AgentFeedback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteeringCorrection {
    pub id: Uuid,
    pub correction: String,
    pub domain: CorrectionDomain,
    pub source: CorrectionSource,
    pub context: Option<String>,
    pub project_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl SteeringCorrection {
    pub fn new(
        correction: impl Into<String>,
        domain: CorrectionDomain,
        source: CorrectionSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            correction: correction.into(),
            domain,
            source,
            context: None,
            project_id: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Global corrections apply across every project.
    pub fn is_global(&self) -> bool {
        self.project_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Message / Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub role: MessageRole,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub session_id: String,
    pub project_id: Option<Uuid>,
    pub status: ConversationStatus,
    pub context_usage_tokens: u64,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Campaign / CodebaseMetrics / CampaignReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseMetrics {
    pub lint_warnings: u32,
    pub lint_errors: u32,
    pub any_type_escapes: u32,
    pub test_file_count: u32,
    pub source_file_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub baseline: CodebaseMetrics,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsDelta {
    pub lint_warnings: i64,
    pub lint_errors: i64,
    pub any_type_escapes: i64,
    pub test_file_count: i64,
    pub source_file_count: i64,
}

impl MetricsDelta {
    pub fn compute(baseline: &CodebaseMetrics, current: &CodebaseMetrics) -> Self {
        Self {
            lint_warnings: current.lint_warnings as i64 - baseline.lint_warnings as i64,
            lint_errors: current.lint_errors as i64 - baseline.lint_errors as i64,
            any_type_escapes: current.any_type_escapes as i64 - baseline.any_type_escapes as i64,
            test_file_count: current.test_file_count as i64 - baseline.test_file_count as i64,
            source_file_count: current.source_file_count as i64 - baseline.source_file_count as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub campaign_id: Uuid,
    pub baseline: CodebaseMetrics,
    pub current: CodebaseMetrics,
    pub delta: MetricsDelta,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// VerificationResult (transient — audit-logged only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Branch,
    Merge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub card_id: Uuid,
    pub gate: Gate,
    pub passed: bool,
    pub tsc_output: String,
    pub lint_output: String,
    pub test_output: String,
    pub tsc_timed_out: bool,
    pub lint_timed_out: bool,
    pub test_timed_out: bool,
    pub timestamp: DateTime<Utc>,
    pub branch_name: String,
}

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        action: impl Into<String>,
        actor: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            action: action.into(),
            actor: actor.into(),
            details,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_card_starts_in_backlog_unverified() {
        let card = KanbanCard::new(Uuid::new_v4(), "t", "d");
        assert_eq!(card.column, Column::Backlog);
        assert!(card.verification_status.is_none());
        assert!(card.check_invariants().is_ok());
    }

    #[test]
    fn done_without_completed_at_violates_invariant() {
        let mut card = KanbanCard::new(Uuid::new_v4(), "t", "d");
        card.column = Column::Done;
        assert!(card.check_invariants().is_err());
    }

    #[test]
    fn running_without_started_at_violates_invariant() {
        let mut card = KanbanCard::new(Uuid::new_v4(), "t", "d");
        card.agent_status = Some(AgentStatus::Running);
        assert!(card.check_invariants().is_err());
    }

    #[test]
    fn global_correction_has_no_project() {
        let c = SteeringCorrection::new("x", CorrectionDomain::Style, CorrectionSource::Explicit);
        assert!(c.is_global());
    }

    #[test]
    fn metrics_delta_signs() {
        let base = CodebaseMetrics {
            lint_warnings: 10,
            lint_errors: 2,
            any_type_escapes: 3,
            test_file_count: 5,
            source_file_count: 40,
        };
        let current = CodebaseMetrics {
            lint_warnings: 8,
            lint_errors: 2,
            any_type_escapes: 1,
            test_file_count: 6,
            source_file_count: 42,
        };
        let delta = MetricsDelta::compute(&base, &current);
        assert_eq!(delta.lint_warnings, -2);
        assert_eq!(delta.any_type_escapes, -2);
        assert_eq!(delta.test_file_count, 1);
    }
}
