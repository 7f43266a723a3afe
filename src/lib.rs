//! modweb
//!
//! A web server that serves a resource directory and hands bound subtrees to
//! handler modules. Resource bytes and loaded handlers are kept in a single
//! TTL cache owned by one worker task.

pub mod cache;
pub mod config;
pub mod config_file;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod modules;
pub mod resource;
pub mod routing;
pub mod settings;
pub mod state;

#[cfg(test)]
mod integration;

pub use cache::{Cache, CacheKey, Namespace, MAX_TTL};
pub use config::{Binding, ServerConfig};
pub use dispatch::Dispatcher;
pub use error::{Result, ServeError};
pub use settings::Settings;
pub use state::AppState;
