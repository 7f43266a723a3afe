//! Demo API module
//!
//! Serves virtual endpoints under its binding. The answer to
//! `/api/magicNumber` is computed at init and kept in the cache.

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::cache::{Namespace, MAX_TTL};
use crate::handler::{HandlerContext, HandlerRequest, ModuleExports, ResponseSink};

pub const MODULE_NAME: &str = "api";

pub const MAGIC_NUMBER: u64 = 42;

const GREETING: &str = "HELLO FROM AN API FUNCTION!";

fn namespace() -> Namespace {
    Namespace::custom(MODULE_NAME)
}

pub fn exports() -> ModuleExports {
    ModuleExports::new()
        .with_init(init)
        .with_request(handle_request)
        .with_virtual_request(handle_virtual_request)
}

fn init(ctx: &HandlerContext) -> BoxFuture<'_, ()> {
    async move {
        ctx.cache
            .insert_with_ttl(namespace(), "magicNumber", Arc::new(MAGIC_NUMBER), MAX_TTL)
            .await;
        debug!("api module initialized");
    }
    .boxed()
}

/// Files under the binding are not ours to serve
fn handle_request<'a>(
    _ctx: &'a HandlerContext,
    _req: &'a HandlerRequest,
    _sink: &'a mut ResponseSink,
    _path: &'a Path,
) -> BoxFuture<'a, bool> {
    async { false }.boxed()
}

fn handle_virtual_request<'a>(
    ctx: &'a HandlerContext,
    req: &'a HandlerRequest,
    sink: &'a mut ResponseSink,
) -> BoxFuture<'a, bool> {
    async move {
        if req.path().trim_end_matches('/').ends_with("/magicNumber") {
            match ctx.cache.fetch_as::<u64>(namespace(), "magicNumber").await {
                Some(number) => {
                    sink.set_content_type("text/plain");
                    sink.write(number.to_string().as_bytes());
                    true
                }
                None => {
                    sink.write_header(StatusCode::INTERNAL_SERVER_ERROR);
                    false
                }
            }
        } else {
            sink.set_content_type("text/plain");
            sink.write(GREETING.as_bytes());
            true
        }
    }
    .boxed()
}
