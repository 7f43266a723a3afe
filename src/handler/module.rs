//! Handler module interface
//!
//! A handler module exports a versioned table of plain function pointers.
//! Modules are linked into a [`ModuleLibrary`] by name; a binding refers to
//! a small TOML manifest that names the module to use.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::cache::Cache;
use crate::settings::Settings;

use super::sink::{HandlerRequest, ResponseSink};

/// Version of the function table layout understood by this server
pub const ABI_VERSION: u32 = 1;

/// Manifest module name that selects the built-in pass-through handler
pub const PASS_THROUGH_MODULE: &str = "passthrough";

/// Services available to handler modules
#[derive(Clone)]
pub struct HandlerContext {
    pub cache: Cache,
    pub settings: Settings,
}

/// Called once, before the first request reaches the module
pub type InitFn = for<'a> fn(&'a HandlerContext) -> BoxFuture<'a, ()>;

/// Serves a request for an existing file
pub type RequestFn = for<'a> fn(
    &'a HandlerContext,
    &'a HandlerRequest,
    &'a mut ResponseSink,
    &'a Path,
) -> BoxFuture<'a, bool>;

/// Serves a request with no backing file
pub type VirtualRequestFn =
    for<'a> fn(&'a HandlerContext, &'a HandlerRequest, &'a mut ResponseSink) -> BoxFuture<'a, bool>;

/// Function table exported by a handler module
///
/// `handle_request` is required. The other entries fall back to defaults:
/// a no-op `init` and a virtual handler that answers 404.
#[derive(Clone, Copy)]
pub struct ModuleExports {
    pub abi_version: u32,
    pub init: Option<InitFn>,
    pub handle_request: Option<RequestFn>,
    pub handle_virtual_request: Option<VirtualRequestFn>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self {
            abi_version: ABI_VERSION,
            init: None,
            handle_request: None,
            handle_virtual_request: None,
        }
    }

    pub fn with_init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_request(mut self, handle_request: RequestFn) -> Self {
        self.handle_request = Some(handle_request);
        self
    }

    pub fn with_virtual_request(mut self, handle_virtual_request: VirtualRequestFn) -> Self {
        self.handle_virtual_request = Some(handle_virtual_request);
        self
    }

    pub fn with_abi_version(mut self, abi_version: u32) -> Self {
        self.abi_version = abi_version;
        self
    }
}

impl Default for ModuleExports {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleExports")
            .field("abi_version", &self.abi_version)
            .field("init", &self.init.is_some())
            .field("handle_request", &self.handle_request.is_some())
            .field("handle_virtual_request", &self.handle_virtual_request.is_some())
            .finish()
    }
}

/// Registry of handler modules linked into the server
#[derive(Debug, Default)]
pub struct ModuleLibrary {
    modules: HashMap<String, ModuleExports>,
}

impl ModuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, name: impl Into<String>, exports: ModuleExports) -> &mut Self {
        self.modules.insert(name.into(), exports);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&ModuleExports> {
        self.modules.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// On-disk description of a handler module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Library name of the module
    pub module: String,
    /// Function table version the module was built for
    pub abi: Option<u32>,
    pub description: Option<String>,
}
