//! `/api/projects/{project_id}/decisions` — the decision log.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::types::Decision;

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new().route(
        "/api/projects/{project_id}/decisions",
        get(list_decisions).post(create_decision),
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateDecisionRequest {
    pub title: String,
    pub reasoning: String,
}

async fn list_decisions(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<Vec<Decision>>>, ApiError> {
    let decisions = state.store.list_decisions(project_id).await?;
    Ok(Json(ApiEnvelope::ok(decisions)))
}

async fn create_decision(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateDecisionRequest>,
) -> Result<Json<ApiEnvelope<Decision>>, ApiError> {
    let decision = Decision::new(project_id, req.title, req.reasoning);
    state.store.create_decision(&decision).await?;
    Ok(Json(ApiEnvelope::ok(decision)))
}
