//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{Binding, CacheConfig, RedirectConfig, ResourceConfig, ServerConfig};
use crate::error::{Result, ServeError};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Resource settings
    pub resources: Option<ResourceSettings>,
    /// Cache settings
    pub cache: Option<CacheSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// Redirect listeners
    pub redirect: Option<RedirectSettings>,
    /// Handler bindings
    #[serde(default)]
    pub bindings: Vec<BindingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_body_bytes: Option<usize>,
    /// Request body read timeout in milliseconds
    pub read_timeout_ms: Option<u64>,
    /// Response timeout in milliseconds
    pub response_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Directory served to clients
    pub root: String,
    /// Directory index files, in preference order
    pub index_files: Option<Vec<String>>,
    /// Cache-Control max-age in seconds
    pub max_age_secs: Option<u64>,
    /// Base directory for relative handler references
    pub module_root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default TTL for cached objects in milliseconds
    pub ttl_ms: u64,
    /// Idle time before the worker sweeps, in milliseconds
    pub sweep_idle_ms: Option<u64>,
    /// Longest time between sweeps, in milliseconds
    pub sweep_interval_ms: Option<u64>,
    /// Operation queue capacity
    pub queue_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectSettings {
    /// Ports that redirect to the main server
    pub ports: Vec<u16>,
    /// Redirect target scheme and host
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSettings {
    /// Path prefix under the resource root
    pub prefix: String,
    /// Handler module manifest
    pub handler: String,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ServeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ServeError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                max_body_bytes: Some(defaults.max_body_bytes),
                read_timeout_ms: Some(defaults.read_timeout_ms),
                response_timeout_ms: Some(defaults.response_timeout_ms),
            },
            resources: Some(ResourceSettings {
                root: defaults.resources.root,
                index_files: Some(defaults.resources.index_files),
                max_age_secs: Some(defaults.resources.max_age_secs),
                module_root: Some(defaults.resources.module_root),
            }),
            cache: Some(CacheSettings {
                ttl_ms: defaults.cache.ttl_ms,
                sweep_idle_ms: Some(defaults.cache.sweep_idle_ms),
                sweep_interval_ms: Some(defaults.cache.sweep_interval_ms),
                queue_capacity: Some(defaults.cache.queue_capacity),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some(defaults.log_format),
            }),
            redirect: None,
            bindings: Vec::new(),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();

        let resources = match self.resources {
            Some(r) => ResourceConfig {
                root: r.root,
                index_files: r.index_files.unwrap_or(defaults.resources.index_files),
                max_age_secs: r.max_age_secs.unwrap_or(defaults.resources.max_age_secs),
                module_root: r.module_root.unwrap_or(defaults.resources.module_root),
            },
            None => defaults.resources,
        };

        let cache = match self.cache {
            Some(c) => CacheConfig {
                ttl_ms: c.ttl_ms,
                sweep_idle_ms: c.sweep_idle_ms.unwrap_or(defaults.cache.sweep_idle_ms),
                sweep_interval_ms: c
                    .sweep_interval_ms
                    .unwrap_or(defaults.cache.sweep_interval_ms),
                queue_capacity: c.queue_capacity.unwrap_or(defaults.cache.queue_capacity),
            },
            None => defaults.cache,
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            max_body_bytes: self.server.max_body_bytes.unwrap_or(defaults.max_body_bytes),
            read_timeout_ms: self.server.read_timeout_ms.unwrap_or(defaults.read_timeout_ms),
            response_timeout_ms: self
                .server
                .response_timeout_ms
                .unwrap_or(defaults.response_timeout_ms),
            redirect: self
                .redirect
                .map(|r| RedirectConfig {
                    ports: r.ports,
                    url: r.url,
                })
                .unwrap_or(defaults.redirect),
            resources,
            cache,
            bindings: self
                .bindings
                .into_iter()
                .map(|b| Binding::new(b.prefix, b.handler))
                .collect(),
            log_level,
            log_format,
        }
    }
}

/// Write the default configuration to `path`
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
