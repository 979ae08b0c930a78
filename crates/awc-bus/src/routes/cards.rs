//! `/api/projects/{project_id}/cards` — Kanban board CRUD plus the
//! lifecycle transitions the work queue exposes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::types::{AgentStatus, Column, KanbanCard};
use awc_queue::Board;

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/projects/{project_id}/board", get(get_board))
        .route("/api/projects/{project_id}/cards", get(list_cards).post(create_card))
        .route("/api/cards/{id}", post(update_card))
        .route("/api/cards/{id}/move", post(move_card))
        .route("/api/cards/{id}/assign", post(assign_agent))
        .route("/api/cards/{id}/status", post(update_agent_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub card: KanbanCard,
    #[serde(default)]
    pub if_updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct MoveCardRequest {
    pub column: Column,
}

#[derive(Debug, Deserialize)]
pub struct AssignAgentRequest {
    pub agent: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentStatusRequest {
    pub status: AgentStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn get_board(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<Board>>, ApiError> {
    let board = state.queue.get_board(project_id).await?;
    Ok(Json(ApiEnvelope::ok(board)))
}

async fn list_cards(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<Vec<KanbanCard>>>, ApiError> {
    let cards = state.store.list_cards_by_project(project_id).await?;
    Ok(Json(ApiEnvelope::ok(cards)))
}

async fn create_card(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateCardRequest>,
) -> Result<Json<ApiEnvelope<KanbanCard>>, ApiError> {
    let card = KanbanCard::new(project_id, req.title, req.description);
    let card = state.queue.create_card(card).await?;
    state.bus.publish(awc_api_types::ServerEvent::CardStatus {
        card_id: card.id,
        column: "backlog".into(),
        agent_status: None,
    });
    Ok(Json(ApiEnvelope::ok(card)))
}

async fn update_card(
    State(state): State<ApiState>,
    Path(_id): Path<Uuid>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<Json<ApiEnvelope<KanbanCard>>, ApiError> {
    let card = state.queue.update_card(&req.card, req.if_updated_at).await?;
    Ok(Json(ApiEnvelope::ok(card)))
}

async fn move_card(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveCardRequest>,
) -> Result<Json<ApiEnvelope<KanbanCard>>, ApiError> {
    let card = state.queue.move_card(id, req.column).await?;
    state.bus.publish(awc_api_types::ServerEvent::CardStatus {
        card_id: card.id,
        column: format!("{:?}", card.column).to_lowercase(),
        agent_status: card.agent_status.map(|s| format!("{s:?}").to_lowercase()),
    });
    Ok(Json(ApiEnvelope::ok(card)))
}

async fn assign_agent(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignAgentRequest>,
) -> Result<Json<ApiEnvelope<KanbanCard>>, ApiError> {
    let card = state.queue.assign_agent(id, req.agent.clone()).await?;
    state.bus.publish(awc_api_types::ServerEvent::CardAssigned {
        card_id: card.id,
        agent: req.agent,
    });
    Ok(Json(ApiEnvelope::ok(card)))
}

async fn update_agent_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAgentStatusRequest>,
) -> Result<Json<ApiEnvelope<KanbanCard>>, ApiError> {
    let card = state.queue.update_agent_status(id, req.status, req.reason).await?;
    Ok(Json(ApiEnvelope::ok(card)))
}
