//! Built-in handler behaviour
//!
//! Raw file serving shared by the dispatcher and the pass-through handler,
//! and the default virtual request handler.

use std::path::Path;

use axum::http::{header, HeaderValue, StatusCode};
use tracing::warn;

use crate::cache::Cache;
use crate::error::Result;
use crate::resource::{content_type, read_resource};

use super::module::HandlerContext;
use super::sink::ResponseSink;

/// Write a file to the sink, reading it through the resource cache
pub async fn serve_raw(
    cache: &Cache,
    sink: &mut ResponseSink,
    path: &Path,
    max_age_secs: u64,
) -> Result<()> {
    let bytes = read_resource(cache, path).await?;

    sink.set_content_type(&content_type(path));
    if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", max_age_secs)) {
        sink.insert_header(header::CACHE_CONTROL, value);
    }
    sink.write_header(StatusCode::OK);
    sink.write(&bytes);
    Ok(())
}

/// Pass-through handler: serve the bound file untouched
pub async fn pass_through(ctx: &HandlerContext, sink: &mut ResponseSink, path: &Path) -> bool {
    let max_age = ctx.settings.snapshot().resources.max_age_secs;
    match serve_raw(&ctx.cache, sink, path, max_age).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Pass-through failed for {}: {}", path.display(), e);
            sink.write_header(e.status());
            false
        }
    }
}

/// Default virtual request handler
pub fn virtual_not_found(sink: &mut ResponseSink) -> bool {
    sink.write_header(StatusCode::NOT_FOUND);
    false
}
