//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Live configuration snapshots
//! - The shared object cache
//! - The request dispatcher and its handler loader

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::Cache;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::handler::{HandlerContext, HandlerLoader, ModuleLibrary};
use crate::settings::Settings;

/// Application state
pub struct AppState {
    pub settings: Settings,
    pub cache: Cache,
    pub dispatcher: Dispatcher,
    pub started_at: Instant,
}

impl AppState {
    /// Build the state and start the cache worker. Must run inside a tokio
    /// runtime.
    pub fn new(config: ServerConfig, library: ModuleLibrary) -> Self {
        let (cache, _worker) = Cache::spawn(&config.cache);
        let settings = Settings::new(config);

        let context = HandlerContext {
            cache: cache.clone(),
            settings: settings.clone(),
        };
        let loader = HandlerLoader::new(context, Arc::new(library));
        let dispatcher = Dispatcher::new(settings.clone(), loader);

        Self {
            settings,
            cache,
            dispatcher,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.settings.snapshot()
    }

    /// Load every bound handler ahead of the first request
    ///
    /// Returns the number of handlers that loaded. Failures are logged and
    /// retried on first use.
    pub async fn preload_handlers(&self) -> usize {
        let mut loaded = 0;
        for binding in self.settings.bindings() {
            match self.dispatcher.loader().load(&binding.handler).await {
                Ok(handler) => {
                    info!("Bound {} to {}", binding.prefix, handler.name());
                    loaded += 1;
                }
                Err(e) => warn!("Handler for {} not preloaded: {}", binding.prefix, e),
            }
        }
        loaded
    }
}
