//! `/api/projects` — project CRUD.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use awc_core::types::Project;

use crate::api_error::ApiError;
use crate::state::ApiState;
use awc_api_types::ApiEnvelope;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", put(update_project))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
}

async fn list_projects(State(state): State<ApiState>) -> Result<Json<ApiEnvelope<Vec<Project>>>, ApiError> {
    let projects = state.store.list_projects().await?;
    Ok(Json(ApiEnvelope::ok(projects)))
}

async fn create_project(
    State(state): State<ApiState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<ApiEnvelope<Project>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(awc_core::error::CoreError::Validation("project name must not be empty".into()).into());
    }
    let project = Project::new(req.name, req.description);
    state.store.create_project(&project).await?;
    Ok(Json(ApiEnvelope::ok(project)))
}

async fn update_project(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(mut project): Json<Project>,
) -> Result<Json<ApiEnvelope<Project>>, ApiError> {
    project.id = id;
    state.store.update_project(&project).await?;
    Ok(Json(ApiEnvelope::ok(project)))
}
