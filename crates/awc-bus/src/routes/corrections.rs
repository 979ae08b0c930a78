//! `/api/corrections` — steering corrections, global or project-scoped.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::types::{CorrectionDomain, CorrectionSource, SteeringCorrection};

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new().route("/api/corrections", get(list_corrections).post(create_correction))
}

#[derive(Debug, Deserialize)]
pub struct ListCorrectionsQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCorrectionRequest {
    pub correction: String,
    pub domain: CorrectionDomain,
    pub source: CorrectionSource,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

async fn list_corrections(
    State(state): State<ApiState>,
    Query(q): Query<ListCorrectionsQuery>,
) -> Result<Json<ApiEnvelope<Vec<SteeringCorrection>>>, ApiError> {
    let corrections = state.store.list_active_corrections(q.project_id).await?;
    Ok(Json(ApiEnvelope::ok(corrections)))
}

async fn create_correction(
    State(state): State<ApiState>,
    Json(req): Json<CreateCorrectionRequest>,
) -> Result<Json<ApiEnvelope<SteeringCorrection>>, ApiError> {
    let mut correction = SteeringCorrection::new(req.correction, req.domain, req.source);
    correction.project_id = req.project_id;
    state.store.create_correction(&correction).await?;
    Ok(Json(ApiEnvelope::ok(correction)))
}
