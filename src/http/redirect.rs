//! Redirect listeners
//!
//! Every request on a redirect port gets a 301 to the main server, keeping
//! the original path and query.

use axum::{
    extract::{OriginalUri, State},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// `Location` for a request: base url, main port, then path and query
pub fn redirect_location(base_url: &str, port: u16, uri: &Uri) -> String {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}:{}{}", base_url.trim_end_matches('/'), port, path)
}

async fn redirect(
    State(target): State<Arc<(String, u16)>>,
    OriginalUri(uri): OriginalUri,
) -> impl IntoResponse {
    let (base_url, port) = target.as_ref();
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, redirect_location(base_url, *port, &uri))],
    )
}

/// Router for a redirect listener
pub fn create_redirect_router(config: &ServerConfig) -> Router {
    let target = Arc::new((config.redirect.url.clone(), config.port));
    Router::new()
        .fallback(redirect)
        .layer(TimeoutLayer::new(config.response_timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(target)
}

/// Bind and serve every configured redirect port in the background
///
/// A port that cannot be bound is logged and skipped.
pub async fn spawn_redirect_listeners(config: &ServerConfig) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();
    for port in &config.redirect.ports {
        let addr = format!("{}:{}", config.host, port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Failed to start redirect listener on {}: {}", addr, e);
                continue;
            }
        };
        tracing::info!(
            "Redirecting {} to {}:{}",
            addr,
            config.redirect.url,
            config.port
        );

        let app = create_redirect_router(config);
        handles.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Redirect listener {} stopped: {}", addr, e);
            }
        }));
    }
    handles
}
