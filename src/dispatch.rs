//! Request dispatch
//!
//! The per-request decision procedure: resolve the URL inside the resource
//! root, find the binding for the resolved path, then either serve the file
//! raw or hand the request to the bound handler.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::{Result, ServeError};
use crate::handler::builtin::serve_raw;
use crate::handler::{HandlerLoader, HandlerRequest, ResponseSink};
use crate::routing::{resolve_binding, resolve_url};
use crate::settings::Settings;

#[derive(Clone)]
pub struct Dispatcher {
    settings: Settings,
    loader: HandlerLoader,
}

impl Dispatcher {
    pub fn new(settings: Settings, loader: HandlerLoader) -> Self {
        Self { settings, loader }
    }

    pub fn loader(&self) -> &HandlerLoader {
        &self.loader
    }

    /// Serve one request into `sink`
    ///
    /// Returns whether the request was served successfully. Failures detected
    /// here write their status; a handler that declines writes its own.
    pub async fn dispatch(&self, req: &HandlerRequest, sink: &mut ResponseSink) -> bool {
        let start = Instant::now();

        let ok = match self.try_dispatch(req, sink).await {
            Ok(ok) => ok,
            Err(e) => {
                match &e {
                    ServeError::InvalidPath(_) => warn!(
                        "Rejected path outside resource root from {:?}: {}",
                        req.remote_addr,
                        req.path()
                    ),
                    ServeError::NotFound(_) => debug!("{}", e),
                    _ => error!("{} {}: {}", req.method, req.path(), e),
                }
                sink.write_header(e.status());
                false
            }
        };

        info!(
            method = %req.method,
            path = req.path(),
            ok,
            status = sink.status().map(|s| s.as_u16()).unwrap_or(200),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request served"
        );
        ok
    }

    async fn try_dispatch(&self, req: &HandlerRequest, sink: &mut ResponseSink) -> Result<bool> {
        let config = self.settings.snapshot();
        let root = Path::new(&config.resources.root);

        let resolved = resolve_url(root, req.path(), &config.resources.index_files).await?;

        match resolve_binding(&config.bindings, root, &resolved.path) {
            None => {
                if !resolved.exists {
                    return Err(ServeError::NotFound(req.path().to_string()));
                }
                let cache = &self.loader.context().cache;
                serve_raw(cache, sink, &resolved.path, config.resources.max_age_secs).await?;
                Ok(true)
            }
            Some(binding) => {
                let handler = self.loader.load(&binding.handler).await?;
                let ctx = self.loader.context();

                if resolved.exists {
                    debug!(
                        "{} -> {} ({})",
                        req.path(),
                        handler.name(),
                        resolved.path.display()
                    );
                    Ok(handler.handle_request(ctx, req, sink, &resolved.path).await)
                } else {
                    debug!("{} -> {} (virtual)", req.path(), handler.name());
                    Ok(handler.handle_virtual_request(ctx, req, sink).await)
                }
            }
        }
    }
}
