//! Handler loading
//!
//! Handlers are memoised in the cache under [`Namespace::HANDLER`], keyed by
//! their manifest reference, and never expire. Each reference also owns a
//! once-cell holding the handler built for it, so a module is opened and
//! initialised at most once per process even when concurrent first requests
//! race or a module flushes the cache. Failed loads are not kept; the next
//! request retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::cache::{Cache, CacheValue, Namespace, MAX_TTL};
use crate::error::{Result, ServeError};

use super::module::{
    HandlerContext, ModuleLibrary, ModuleManifest, ABI_VERSION, PASS_THROUGH_MODULE,
};
use super::Handler;

/// Loads handler modules through the cache
#[derive(Clone)]
pub struct HandlerLoader {
    context: HandlerContext,
    library: Arc<ModuleLibrary>,
    loaded: Arc<DashMap<String, Arc<OnceCell<Arc<Handler>>>>>,
}

impl HandlerLoader {
    pub fn new(context: HandlerContext, library: Arc<ModuleLibrary>) -> Self {
        Self {
            context,
            library,
            loaded: Arc::new(DashMap::new()),
        }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    fn cache(&self) -> &Cache {
        &self.context.cache
    }

    /// Get a ready handler for a manifest reference
    pub async fn load(&self, reference: &str) -> Result<Arc<Handler>> {
        if let Some(handler) = self.cached(reference).await {
            return Ok(handler);
        }

        let cell = self
            .loaded
            .entry(reference.to_string())
            .or_default()
            .value()
            .clone();

        // Waiters block here until the first caller finishes; an error leaves
        // the cell empty for the next attempt
        let handler = cell
            .get_or_try_init(|| async {
                let handler = match self.open(reference).await {
                    Ok(handler) => Arc::new(handler),
                    Err(e) => {
                        error!("{}", e);
                        return Err(e);
                    }
                };
                handler.init(&self.context).await;
                info!("Loaded handler {} from {}", handler.name(), reference);
                Ok(handler)
            })
            .await?
            .clone();

        // Also restores the entry after a flush; a no-op when already cached
        let value: CacheValue = handler.clone();
        self.cache()
            .insert_with_ttl(Namespace::HANDLER, reference, value, MAX_TTL)
            .await;

        Ok(handler)
    }

    async fn cached(&self, reference: &str) -> Option<Arc<Handler>> {
        let handler = self
            .cache()
            .fetch_as::<Handler>(Namespace::HANDLER, reference)
            .await;
        if handler.is_some() {
            debug!("Handler cache hit: {}", reference);
        }
        handler
    }

    /// Manifest location for a reference
    pub fn manifest_path(&self, reference: &str) -> PathBuf {
        let reference = Path::new(reference);
        if reference.is_absolute() {
            return reference.to_path_buf();
        }
        let module_root = self.context.settings.snapshot().resources.module_root.clone();
        Path::new(&module_root).join(reference)
    }

    async fn open(&self, reference: &str) -> Result<Handler> {
        let path = self.manifest_path(reference);
        debug!("Opening handler manifest {}", path.display());

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ServeError::load(reference, format!("{}: {}", path.display(), e)))?;
        let manifest: ModuleManifest =
            toml::from_str(&text).map_err(|e| ServeError::load(reference, e))?;

        if let Some(abi) = manifest.abi {
            if abi != ABI_VERSION {
                return Err(ServeError::load(
                    reference,
                    format!("manifest requires ABI {}, server speaks {}", abi, ABI_VERSION),
                ));
            }
        }

        if manifest.module == PASS_THROUGH_MODULE {
            return Ok(Handler::PassThrough);
        }

        let exports = self.library.resolve(&manifest.module).ok_or_else(|| {
            ServeError::load(
                reference,
                format!("module {} is not registered", manifest.module),
            )
        })?;

        Handler::from_exports(reference, &manifest.module, exports)
    }
}
