//! `/api/projects/{project_id}/search` and `/api/search` — full-text search
//! across cards, documents and decisions, scoped to one project or global.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::search::SearchHit;

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/projects/{project_id}/search", get(search_project))
        .route("/api/search", get(search_global))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

async fn search_project(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ApiEnvelope<Vec<SearchHit>>>, ApiError> {
    let hits = state.store.search(Some(project_id), &q.q).await?;
    Ok(Json(ApiEnvelope::ok(hits)))
}

async fn search_global(
    State(state): State<ApiState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ApiEnvelope<Vec<SearchHit>>>, ApiError> {
    let hits = state.store.search(None, &q.q).await?;
    Ok(Json(ApiEnvelope::ok(hits)))
}
