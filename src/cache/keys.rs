//! Typed cache key space
//!
//! Every cached object lives under a namespace so unrelated object kinds
//! (resource bytes, handler modules, database handles, template helpers)
//! can share one store. Keys are two-part values, never concatenated strings.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// TTL for values that should never expire
pub const MAX_TTL: Duration = Duration::MAX;

/// Cache type namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(Cow<'static, str>);

impl Namespace {
    /// Raw resource bytes keyed by filesystem path
    pub const RESOURCE: Namespace = Namespace(Cow::Borrowed("static"));

    /// Loaded handler modules keyed by module reference
    pub const HANDLER: Namespace = Namespace(Cow::Borrowed("handler"));

    /// Database handles keyed by DSN
    pub const DATABASE: Namespace = Namespace(Cow::Borrowed("database"));

    /// Template helper modules keyed by template name
    pub const TEMPLATE_HELPER: Namespace = Namespace(Cow::Borrowed("template_helper"));

    /// Namespace owned by a handler module or other external code
    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: Namespace,
    pub name: String,
}

impl CacheKey {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
