//! The duplex event-stream frame types: the closed set of events the server
//! may emit, and the frames a client may send back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Every frame the server may emit on the duplex channel, tagged by `type`.
/// This is the closed set — nothing outside it is valid to publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename = "chat.stream")]
    ChatStream { session_id: Uuid, delta: String },
    #[serde(rename = "chat.complete")]
    ChatComplete { session_id: Uuid },
    #[serde(rename = "chat.tool_call")]
    ChatToolCall { session_id: Uuid, tool: String, args: Value },
    #[serde(rename = "chat.error")]
    ChatError { session_id: Uuid, message: String },
    #[serde(rename = "chat.handoff")]
    ChatHandoff { session_id: Uuid, to_card_id: Uuid },
    #[serde(rename = "chat.handoff_complete")]
    ChatHandoffComplete { session_id: Uuid, card_id: Uuid },
    #[serde(rename = "chat.transcription")]
    ChatTranscription { session_id: Uuid, text: String },
    #[serde(rename = "chat.audio")]
    ChatAudio { session_id: Uuid, bytes_base64: String },
    #[serde(rename = "workspace.action")]
    WorkspaceAction { card_id: Option<Uuid>, action: Value },
    Presence { client_count: usize },
    #[serde(rename = "card.assigned")]
    CardAssigned { card_id: Uuid, agent: String },
    #[serde(rename = "card.status")]
    CardStatus { card_id: Uuid, column: String, agent_status: Option<String> },
    #[serde(rename = "agent.log")]
    AgentLog { card_id: Uuid, agent_id: Uuid, stream: String, line: String },
    #[serde(rename = "agent.spawned")]
    AgentSpawned { card_id: Uuid, agent_id: Uuid },
    #[serde(rename = "agent.completed")]
    AgentCompleted { card_id: Uuid, agent_id: Uuid, success: bool },
    #[serde(rename = "agent.failed")]
    AgentFailed { card_id: Uuid, reason: String },
    #[serde(rename = "system.heartbeat")]
    SystemHeartbeat { tick_at: DateTime<Utc> },
    #[serde(rename = "system.synthesizer")]
    SystemSynthesizer { merged: u32, conflicts: u32 },
    #[serde(rename = "verification.started")]
    VerificationStarted { card_id: Uuid, gate: String },
    #[serde(rename = "verification.passed")]
    VerificationPassed { card_id: Uuid, gate: String },
    #[serde(rename = "verification.failed")]
    VerificationFailed { card_id: Uuid, gate: String, reason: String },
    #[serde(rename = "campaign.report")]
    CampaignReport { campaign_id: Uuid, report: Value },
    Ping,
    Pong,
}

impl ServerEvent {
    /// The coarse audit category every server event (other than `agent.log`,
    /// which is bypass-audited for volume) is recorded under.
    pub fn audit_category(&self) -> Option<&'static str> {
        match self {
            ServerEvent::AgentLog { .. } | ServerEvent::Ping | ServerEvent::Pong => None,
            ServerEvent::ChatStream { .. }
            | ServerEvent::ChatComplete { .. }
            | ServerEvent::ChatToolCall { .. }
            | ServerEvent::ChatError { .. }
            | ServerEvent::ChatHandoff { .. }
            | ServerEvent::ChatHandoffComplete { .. }
            | ServerEvent::ChatTranscription { .. }
            | ServerEvent::ChatAudio { .. } => Some("chat"),
            ServerEvent::WorkspaceAction { .. } => Some("workspace_action"),
            ServerEvent::Presence { .. } => Some("presence"),
            ServerEvent::CardAssigned { .. } | ServerEvent::CardStatus { .. } => Some("card"),
            ServerEvent::AgentSpawned { .. } | ServerEvent::AgentCompleted { .. } | ServerEvent::AgentFailed { .. } => {
                Some("agent")
            }
            ServerEvent::SystemHeartbeat { .. } | ServerEvent::SystemSynthesizer { .. } => Some("system"),
            ServerEvent::VerificationStarted { .. }
            | ServerEvent::VerificationPassed { .. }
            | ServerEvent::VerificationFailed { .. } => Some("verification"),
            ServerEvent::CampaignReport { .. } => Some("campaign"),
        }
    }
}

/// Frames a client may send on the duplex channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Chat { session_id: Uuid, text: String },
    Voice { session_id: Uuid, bytes_base64: String },
    Subscribe { channels: Vec<String> },
    Ping,
    Pong,
}
