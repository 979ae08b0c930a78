//! `/api/health` and `/metrics` — unauthenticated liveness/observability probes.

use axum::{routing::get, Json, Router};
use serde_json::json;

use awc_telemetry::metrics::global_metrics;

use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"ok": true, "data": {"status": "up"}}))
}

async fn metrics() -> String {
    global_metrics().export_prometheus()
}
