//! `/api/projects/{project_id}/campaigns` — codebase-metrics baselines the
//! synthesizer diffs against when it publishes a `campaign.report` event.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::types::{Campaign, CodebaseMetrics};

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/projects/{project_id}/campaigns", post(create_campaign))
        .route("/api/campaigns/{id}", get(get_campaign))
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub baseline: CodebaseMetrics,
}

async fn create_campaign(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<Json<ApiEnvelope<Campaign>>, ApiError> {
    let campaign = Campaign {
        id: Uuid::new_v4(),
        project_id,
        name: req.name,
        baseline: req.baseline,
        created_at: chrono::Utc::now(),
    };
    state.store.create_campaign(&campaign).await?;
    Ok(Json(ApiEnvelope::ok(campaign)))
}

async fn get_campaign(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<Option<Campaign>>>, ApiError> {
    let campaign = state.store.get_campaign(id).await?;
    Ok(Json(ApiEnvelope::ok(campaign)))
}
