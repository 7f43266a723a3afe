//! HTTP request handlers
//!
//! Status endpoints plus the catch-all handler that feeds every other
//! request to the dispatcher.

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::CacheStats;
use crate::handler::{HandlerRequest, ResponseSink};
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    PayloadTooLarge(usize),
    RequestTimeout(Duration),
    Unavailable(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body exceeds {} bytes", limit),
            ),
            HttpError::RequestTimeout(limit) => (
                StatusCode::REQUEST_TIMEOUT,
                format!("Request body not received within {:?}", limit),
            ),
            HttpError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, body).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("modweb v", env!("CARGO_PKG_VERSION"))
}

/// Cache statistics endpoint
/// GET /_status/cache
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Result<Json<CacheStats>, HttpError> {
    state
        .cache
        .stats()
        .await
        .map(Json)
        .ok_or_else(|| HttpError::Unavailable("Cache worker is not running".to_string()))
}

/// Everything else: buffer the request and dispatch it
pub async fn serve_request(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, HttpError> {
    let config = state.config();
    let limit = config.max_body_bytes;
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(HttpError::PayloadTooLarge(limit));
    }

    let read_timeout = config.read_timeout();
    let body = match tokio::time::timeout(read_timeout, to_bytes(body, limit)).await {
        Ok(Ok(bytes)) => bytes,
        Err(_) => {
            warn!("{} {}: request body timed out", parts.method, parts.uri);
            return Err(HttpError::RequestTimeout(read_timeout));
        }
        Ok(Err(e)) => {
            warn!("{} {}: request body rejected: {}", parts.method, parts.uri, e);
            return Err(HttpError::PayloadTooLarge(limit));
        }
    };

    let req = HandlerRequest::from_parts(&parts, body);
    let mut sink = ResponseSink::new();
    state.dispatcher.dispatch(&req, &mut sink).await;

    Ok(sink.into_response())
}
