//! Request handlers
//!
//! A bound path is served by a [`Handler`]: either the built-in pass-through
//! handler or a module from the [`ModuleLibrary`]. Handlers are loaded once
//! by the [`HandlerLoader`] and shared by every request through the cache.

pub mod builtin;
pub mod loader;
pub mod module;
pub mod sink;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::{Result, ServeError};

pub use loader::HandlerLoader;
pub use module::{
    HandlerContext, InitFn, ModuleExports, ModuleLibrary, ModuleManifest, RequestFn,
    VirtualRequestFn, ABI_VERSION, PASS_THROUGH_MODULE,
};
pub use sink::{HandlerRequest, ResponseSink};

/// A handler backed by a module's function table
pub struct ModuleHandler {
    /// Library name of the module
    pub name: String,
    init: Option<InitFn>,
    handle_request: RequestFn,
    handle_virtual_request: Option<VirtualRequestFn>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for ModuleHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHandler")
            .field("name", &self.name)
            .field("has_init", &self.init.is_some())
            .field("has_virtual", &self.handle_virtual_request.is_some())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl ModuleHandler {
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

/// Anything that can serve a bound request
#[derive(Debug)]
pub enum Handler {
    PassThrough,
    Module(ModuleHandler),
}

impl Handler {
    /// Check a module's exports and fill in defaults for optional entries
    pub fn from_exports(reference: &str, name: &str, exports: &ModuleExports) -> Result<Self> {
        if exports.abi_version != ABI_VERSION {
            return Err(ServeError::invalid_handler(
                reference,
                format!(
                    "module {} was built for ABI {}, server speaks {}",
                    name, exports.abi_version, ABI_VERSION
                ),
            ));
        }

        let handle_request = exports.handle_request.ok_or_else(|| {
            ServeError::invalid_handler(reference, format!("module {} has no request handler", name))
        })?;

        if exports.init.is_none() {
            info!("Module {} has no init, using default", name);
        }
        if exports.handle_virtual_request.is_none() {
            info!("Module {} has no virtual request handler, using default", name);
        }

        Ok(Handler::Module(ModuleHandler {
            name: name.to_string(),
            init: exports.init,
            handle_request,
            handle_virtual_request: exports.handle_virtual_request,
            initialized: AtomicBool::new(false),
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            Handler::PassThrough => PASS_THROUGH_MODULE,
            Handler::Module(m) => &m.name,
        }
    }

    /// Run the module's init. Later calls do nothing.
    pub async fn init(&self, ctx: &HandlerContext) {
        if let Handler::Module(m) = self {
            if m.initialized.swap(true, Ordering::AcqRel) {
                debug!("Module {} already initialized", m.name);
                return;
            }
            if let Some(init) = m.init {
                init(ctx).await;
            }
        }
    }

    pub async fn handle_request(
        &self,
        ctx: &HandlerContext,
        req: &HandlerRequest,
        sink: &mut ResponseSink,
        path: &Path,
    ) -> bool {
        match self {
            Handler::PassThrough => builtin::pass_through(ctx, sink, path).await,
            Handler::Module(m) => (m.handle_request)(ctx, req, sink, path).await,
        }
    }

    pub async fn handle_virtual_request(
        &self,
        ctx: &HandlerContext,
        req: &HandlerRequest,
        sink: &mut ResponseSink,
    ) -> bool {
        match self {
            Handler::PassThrough => builtin::virtual_not_found(sink),
            Handler::Module(m) => match m.handle_virtual_request {
                Some(handle) => handle(ctx, req, sink).await,
                None => builtin::virtual_not_found(sink),
            },
        }
    }
}
