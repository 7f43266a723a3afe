//! Server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default time-to-live for cached objects in milliseconds
    pub ttl_ms: u64,

    /// Sweep when the cache worker has been idle this long
    pub sweep_idle_ms: u64,

    /// Force a sweep at least this often, even under load
    pub sweep_interval_ms: u64,

    /// Operation queue capacity
    pub queue_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 60_000, // 1 minute
            sweep_idle_ms: 1,
            sweep_interval_ms: 1_000,
            queue_capacity: 100,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Binds a path prefix under the resource root to a handler module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Path prefix relative to the resource root, e.g. "/api/"
    pub prefix: String,

    /// Handler module reference (path to its manifest)
    pub handler: String,
}

impl Binding {
    pub fn new(prefix: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            handler: handler.into(),
        }
    }
}

/// Extra listeners that answer every request with a permanent redirect
///
/// The `Location` is `url`, a colon and the main server port, followed by
/// the original path and query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Ports to listen on, on the main server's host
    pub ports: Vec<u16>,

    /// Scheme and host to redirect to, e.g. "https://example.com"
    pub url: String,
}

/// Resource serving configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Directory that URLs are resolved against
    pub root: String,

    /// Index files tried for directory requests, in order
    pub index_files: Vec<String>,

    /// Cache-Control max-age for raw resources in seconds
    pub max_age_secs: u64,

    /// Directory that relative handler references are resolved against
    pub module_root: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            root: "./static".to_string(),
            index_files: vec!["index.tmpl".to_string(), "index.html".to_string()],
            max_age_secs: 60,
            module_root: ".".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,

    /// Time allowed to receive a request body, in milliseconds
    pub read_timeout_ms: u64,

    /// Time allowed to produce a response, in milliseconds
    pub response_timeout_ms: u64,

    /// Redirect listeners
    pub redirect: RedirectConfig,

    /// Resource configuration
    pub resources: ResourceConfig,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Handler bindings
    pub bindings: Vec<Binding>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 10 * 1024 * 1024,
            read_timeout_ms: 1_000,
            response_timeout_ms: 10_000,
            redirect: RedirectConfig::default(),
            resources: ResourceConfig::default(),
            cache: CacheConfig::default(),
            bindings: Vec::new(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}
