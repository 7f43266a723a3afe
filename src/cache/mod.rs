//! Shared object cache
//!
//! One TTL store shared by the whole server:
//! - Typed two-part keys so object kinds never collide
//! - A single worker task that serialises every read and write
//! - Background expiry sweeping between operations

pub mod actor;
pub mod keys;
pub mod store;

pub use actor::Cache;
pub use keys::{CacheKey, Namespace, MAX_TTL};
pub use store::{CacheStats, CacheValue};
