//! `/api/projects/{project_id}/usage` — token usage / cost tracking.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::usage::{TokenUsage, UsageTotals};

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new().route(
        "/api/projects/{project_id}/usage",
        get(usage_totals).post(record_usage),
    )
}

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

async fn usage_totals(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<UsageTotals>>, ApiError> {
    let totals = state.store.usage_totals_for_project(project_id).await?;
    Ok(Json(ApiEnvelope::ok(totals)))
}

async fn record_usage(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<RecordUsageRequest>,
) -> Result<Json<ApiEnvelope<()>>, ApiError> {
    let usage = TokenUsage {
        id: Uuid::new_v4(),
        project_id: Some(project_id),
        session_id: req.session_id,
        input_tokens: req.input_tokens,
        output_tokens: req.output_tokens,
    };
    state.store.record_usage(&usage).await?;
    Ok(Json(ApiEnvelope::ok(())))
}
