//! Assembles the top-level router: every resource module merged together,
//! with the bearer-auth layer wrapping everything except `/api/health`.

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use awc_telemetry::{middleware::metrics_middleware, tracing_setup::request_id_middleware};

use crate::auth::AuthLayer;
use crate::routes;
use crate::state::ApiState;

pub fn build_router(state: ApiState) -> Router {
    let authenticated = Router::new()
        .merge(routes::projects::router())
        .merge(routes::campaigns::router())
        .merge(routes::cards::router())
        .merge(routes::documents::router())
        .merge(routes::decisions::router())
        .merge(routes::corrections::router())
        .merge(routes::messages::router())
        .merge(routes::usage::router())
        .merge(routes::search::router())
        .merge(routes::audit::router())
        .merge(routes::ws::router())
        .layer(AuthLayer::new(state.bearer_token.as_str().to_string()));

    Router::new()
        .merge(routes::health::router())
        .merge(authenticated)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
