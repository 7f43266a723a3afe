//! Request and response types seen by handlers

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// An HTTP request, fully buffered
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
}

impl HandlerRequest {
    /// Build from request parts and an already collected body
    pub fn from_parts(parts: &axum::http::request::Parts, body: Bytes) -> Self {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            body,
            remote_addr,
        }
    }

    /// Shorthand for tests and internal callers
    pub fn get(uri: &str) -> Self {
        Self {
            method: Method::GET,
            uri: uri.parse().unwrap_or_default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

/// Response under construction
///
/// The status line is written once. Body bytes written before any status
/// imply 200 OK.
#[derive(Debug, Default)]
pub struct ResponseSink {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status. Only the first call has any effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(existing) => debug!(
                "Ignoring status {} after {} was already written",
                status, existing
            ),
            None => self.status = Some(status),
        }
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(data);
    }

    pub fn is_header_written(&self) -> bool {
        self.status.is_some()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl IntoResponse for ResponseSink {
    fn into_response(self) -> Response {
        let status = self.status.unwrap_or(StatusCode::OK);
        let mut response = Response::new(Body::from(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}
