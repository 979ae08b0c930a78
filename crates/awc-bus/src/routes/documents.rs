//! `/api/projects/{project_id}/documents` — briefs, instructions,
//! reference material, and the singleton assumptions/state documents.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::types::{DocumentType, ProjectDocument};

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new().route(
        "/api/projects/{project_id}/documents",
        get(list_documents).post(upsert_document),
    )
}

#[derive(Debug, Deserialize)]
pub struct UpsertDocumentRequest {
    pub doc_type: DocumentType,
    pub title: String,
    pub content: String,
}

async fn list_documents(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<Vec<ProjectDocument>>>, ApiError> {
    let docs = state.store.list_documents(project_id).await?;
    Ok(Json(ApiEnvelope::ok(docs)))
}

async fn upsert_document(
    State(state): State<ApiState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpsertDocumentRequest>,
) -> Result<Json<ApiEnvelope<ProjectDocument>>, ApiError> {
    let doc = ProjectDocument::new(project_id, req.doc_type, req.title, req.content);
    state.store.upsert_document(&doc).await?;
    Ok(Json(ApiEnvelope::ok(doc)))
}
