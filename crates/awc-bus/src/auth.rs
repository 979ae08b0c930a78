//! Bearer authentication middleware for the HTTP API and event stream.
//!
//! Every mutating request must carry the configured bearer credential via
//! the `Authorization: Bearer <token>` header. The duplex event-stream
//! endpoint additionally accepts the credential as a `?token=` query param,
//! since browser `WebSocket` clients can't set arbitrary headers on the
//! opening handshake. Comparison is constant-time to avoid timing side
//! channels on the token.

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};

use awc_api_types::{ApiEnvelope, ApiErrorBody};

/// A [`tower::Layer`] that wraps services with [`AuthMiddleware`].
#[derive(Clone)]
pub struct AuthLayer {
    bearer_token: Arc<String>,
}

impl AuthLayer {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: Arc::new(bearer_token.into()),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            bearer_token: self.bearer_token.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    bearer_token: Arc<String>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let expected = self.bearer_token.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let provided = bearer_from_header(&req).or_else(|| token_from_query(&req));

            match provided {
                Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => {
                    inner.call(req).await
                }
                _ => {
                    let body = ApiEnvelope::<()>::err(ApiErrorBody::new(
                        "unauthorized",
                        "missing or invalid bearer credential",
                    ));
                    Ok((StatusCode::UNAUTHORIZED, axum::Json(body)).into_response())
                }
            }
        })
    }
}

fn bearer_from_header(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// `?token=...` — only meaningful for the event-stream handshake, but
/// checked unconditionally since any other route ignoring it is harmless.
fn token_from_query(req: &Request<Body>) -> Option<String> {
    let query = req.uri().query()?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == "token").then(|| v.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(AuthLayer::new("secret123"))
    }

    #[tokio::test]
    async fn valid_bearer_token_passes() {
        let app = test_router();
        let req = Request::builder()
            .uri("/ping")
            .header("Authorization", "Bearer secret123")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_query_token_passes() {
        let app = test_router();
        let req = Request::builder()
            .uri("/ping?token=secret123")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_returns_401() {
        let app = test_router();
        let req = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_bearer_returns_401() {
        let app = test_router();
        let req = Request::builder()
            .uri("/ping")
            .header("Authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn x_api_key_header_is_not_accepted() {
        let app = test_router();
        let req = Request::builder()
            .uri("/ping")
            .header("X-API-Key", "secret123")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
