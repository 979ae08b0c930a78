//! Maps [`CoreError`]'s taxonomy onto HTTP status codes and the shared
//! [`ApiEnvelope`] error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use awc_api_types::{ApiEnvelope, ApiErrorBody};
use awc_core::error::CoreError;

/// A thin wrapper so a route handler can return `Result<T, ApiError>` and
/// get the right status code and envelope shape for free.
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict { .. } => StatusCode::CONFLICT,
            CoreError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            CoreError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            CoreError::External(_) => StatusCode::BAD_GATEWAY,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = ApiErrorBody::new(self.0.kind(), self.0.to_string());
        if let CoreError::Conflict {
            current_updated_at: Some(ts),
            ..
        } = &self.0
        {
            body = body.with_conflict_timestamp(*ts);
        }

        (status, Json(ApiEnvelope::<()>::err(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = CoreError::NotFound("no such card".into()).into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err: ApiError = CoreError::conflict("stale", chrono::Utc::now()).into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn busy_maps_to_429() {
        let err: ApiError = CoreError::Busy("at capacity".into()).into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn validation_maps_to_400() {
        let err: ApiError = CoreError::Validation("empty title".into()).into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
