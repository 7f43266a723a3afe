//! Live configuration snapshots
//!
//! Request handling reads configuration through [`Settings`], which hands out
//! immutable `Arc<ServerConfig>` snapshots. A replaced configuration is seen by
//! the next snapshot; in-flight requests keep the one they started with.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::config::{Binding, ServerConfig};

/// Shared handle to the current server configuration
#[derive(Clone)]
pub struct Settings {
    sender: Arc<watch::Sender<Arc<ServerConfig>>>,
}

impl Settings {
    pub fn new(config: ServerConfig) -> Self {
        let (sender, _) = watch::channel(Arc::new(config));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Current configuration snapshot
    pub fn snapshot(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.sender.borrow())
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.snapshot().bindings.clone()
    }

    pub fn resource_root(&self) -> PathBuf {
        PathBuf::from(&self.snapshot().resources.root)
    }

    pub fn default_cache_ttl(&self) -> Duration {
        self.snapshot().cache.default_ttl()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ServerConfig>> {
        self.sender.subscribe()
    }

    /// Publish a new configuration to every subscriber
    pub fn replace(&self, config: ServerConfig) {
        info!("Configuration replaced");
        self.sender.send_replace(Arc::new(config));
    }
}

/// Forward default TTL changes to the cache
pub fn spawn_ttl_listener(settings: &Settings, cache: Cache) -> JoinHandle<()> {
    let mut receiver = settings.subscribe();
    let mut current = receiver.borrow_and_update().cache.default_ttl();

    tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let ttl = receiver.borrow_and_update().cache.default_ttl();
            if ttl != current {
                debug!("Default cache ttl {:?} -> {:?}", current, ttl);
                cache.update_default_ttl(ttl).await;
                current = ttl;
            }
        }
    })
}
