//! `/api/audit` — read-only access to the audit trail.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use awc_core::types::AuditEntry;

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/audit/entity/{entity_type}/{entity_id}", get(for_entity))
        .route("/api/audit/since", get(since))
}

async fn for_entity(
    State(state): State<ApiState>,
    axum::extract::Path((entity_type, entity_id)): axum::extract::Path<(String, String)>,
) -> Result<Json<ApiEnvelope<Vec<AuditEntry>>>, ApiError> {
    let entries = state.store.audit_for_entity(entity_type, entity_id).await?;
    Ok(Json(ApiEnvelope::ok(entries)))
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    pub since: DateTime<Utc>,
}

async fn since(
    State(state): State<ApiState>,
    Query(q): Query<SinceQuery>,
) -> Result<Json<ApiEnvelope<Vec<AuditEntry>>>, ApiError> {
    let entries = state.store.audit_since(q.since).await?;
    Ok(Json(ApiEnvelope::ok(entries)))
}
