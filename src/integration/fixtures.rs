//! Test fixtures for integration tests
//!
//! Provides a throwaway site on disk and a module library with test modules.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use axum::Router;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tempfile::TempDir;

use crate::config::{Binding, ResourceConfig, ServerConfig};
use crate::handler::{HandlerContext, HandlerRequest, ModuleExports, ModuleLibrary, ResponseSink};
use crate::http::create_router;
use crate::modules::api;
use crate::resource::read_resource;
use crate::state::AppState;

/// Init calls per resource root, so parallel tests don't share counts
fn init_counts() -> &'static DashMap<String, usize> {
    static COUNTS: OnceLock<DashMap<String, usize>> = OnceLock::new();
    COUNTS.get_or_init(DashMap::new)
}

/// How many times the `shout` module was initialised for a site
pub fn shout_init_count(site: &TestSite) -> usize {
    init_counts()
        .get(&site.root_string())
        .map(|count| *count)
        .unwrap_or(0)
}

fn shout_init(ctx: &HandlerContext) -> BoxFuture<'_, ()> {
    async move {
        let root = ctx.settings.snapshot().resources.root.clone();
        // Slow enough that concurrent first requests overlap
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        *init_counts().entry(root).or_insert(0) += 1;
    }
    .boxed()
}

/// Serves bound files upper-cased
fn shout_request<'a>(
    ctx: &'a HandlerContext,
    _req: &'a HandlerRequest,
    sink: &'a mut ResponseSink,
    path: &'a Path,
) -> BoxFuture<'a, bool> {
    async move {
        match read_resource(&ctx.cache, path).await {
            Ok(bytes) => {
                sink.set_content_type("text/plain");
                sink.write(&bytes.to_ascii_uppercase());
                true
            }
            Err(e) => {
                sink.write_header(e.status());
                false
            }
        }
    }
    .boxed()
}

fn shout_virtual<'a>(
    _ctx: &'a HandlerContext,
    req: &'a HandlerRequest,
    sink: &'a mut ResponseSink,
) -> BoxFuture<'a, bool> {
    async move {
        sink.write(format!("VIRTUAL {}", req.path()).as_bytes());
        true
    }
    .boxed()
}

/// Module library used by the integration tests
pub fn test_library() -> ModuleLibrary {
    let mut library = ModuleLibrary::new();
    library
        .register(api::MODULE_NAME, api::exports())
        .register(
            "shout",
            ModuleExports::new()
                .with_init(shout_init)
                .with_request(shout_request)
                .with_virtual_request(shout_virtual),
        )
        .register("broken", ModuleExports::new().with_init(shout_init));
    library
}

/// A resource root and a module directory inside one temporary directory
pub struct TestSite {
    dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("www")).unwrap();
        std::fs::create_dir(dir.path().join("modules")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("www")
    }

    pub fn root_string(&self) -> String {
        self.root().to_string_lossy().into_owned()
    }

    pub fn module_root(&self) -> PathBuf {
        self.dir.path().join("modules")
    }

    /// Path outside the resource root
    pub fn outside(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write a file under the resource root, creating parent directories
    pub fn resource(&self, relative: &str, content: &str) -> &Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    /// Write `<name>.toml` naming `module`
    pub fn manifest(&self, name: &str, module: &str) -> &Self {
        std::fs::write(
            self.module_root().join(format!("{}.toml", name)),
            format!("module = \"{}\"\nabi = 1\n", module),
        )
        .unwrap();
        self
    }

    pub fn config(&self, bindings: Vec<Binding>) -> ServerConfig {
        ServerConfig {
            resources: ResourceConfig {
                root: self.root_string(),
                module_root: self.module_root().to_string_lossy().into_owned(),
                ..Default::default()
            },
            bindings,
            ..Default::default()
        }
    }

    pub fn state(&self, bindings: Vec<Binding>) -> Arc<AppState> {
        Arc::new(AppState::new(self.config(bindings), test_library()))
    }

    pub fn app(&self, bindings: Vec<Binding>) -> Router {
        create_router(self.state(bindings))
    }
}
