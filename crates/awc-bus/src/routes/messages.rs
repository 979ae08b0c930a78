//! `/api/conversations` — chat history, append-only.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use awc_core::types::{Conversation, ConversationStatus, Message, MessageRole};

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/conversations", post(create_conversation))
        .route(
            "/api/conversations/{id}/messages",
            get(list_messages).post(append_message),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub session_id: String,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AppendMessageRequest {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

async fn create_conversation(
    State(state): State<ApiState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<Json<ApiEnvelope<Conversation>>, ApiError> {
    let now = chrono::Utc::now();
    let conversation = Conversation {
        id: Uuid::new_v4(),
        session_id: req.session_id,
        project_id: req.project_id,
        status: ConversationStatus::Active,
        context_usage_tokens: 0,
        summary: None,
        created_at: now,
        updated_at: now,
    };
    state.store.create_conversation(&conversation).await?;
    Ok(Json(ApiEnvelope::ok(conversation)))
}

async fn list_messages(
    State(state): State<ApiState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<Vec<Message>>>, ApiError> {
    let messages = state.store.list_messages(conversation_id).await?;
    Ok(Json(ApiEnvelope::ok(messages)))
}

async fn append_message(
    State(state): State<ApiState>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<AppendMessageRequest>,
) -> Result<Json<ApiEnvelope<Message>>, ApiError> {
    let message = Message {
        id: Uuid::new_v4(),
        conversation_id: Some(conversation_id),
        project_id: req.project_id,
        role: req.role,
        content: req.content,
        metadata: req.metadata,
        created_at: chrono::Utc::now(),
    };
    state.store.append_message(&message).await?;

    let applied = crate::workspace_action::apply_actions(&message.content, &state.store, &state.queue).await;
    if applied > 0 {
        tracing::debug!(applied, "applied workspace actions embedded in message");
    }

    Ok(Json(ApiEnvelope::ok(message)))
}
