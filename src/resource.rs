//! Resource file reads
//!
//! File bytes are memoised in the shared cache under [`Namespace::RESOURCE`],
//! keyed by filesystem path, so repeated requests skip the disk.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::cache::{Cache, Namespace};
use crate::error::{Result, ServeError};

/// Read a resource file through the cache
pub async fn read_resource(cache: &Cache, path: &Path) -> Result<Bytes> {
    let name = path.to_string_lossy().into_owned();

    if let Some(bytes) = cache.fetch_as::<Bytes>(Namespace::RESOURCE, name.as_str()).await {
        debug!("Resource cache hit: {}", name);
        return Ok(Bytes::clone(&bytes));
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(data) => Bytes::from(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServeError::NotFound(name));
        }
        Err(e) => return Err(e.into()),
    };

    debug!("Resource cache miss: {} ({} bytes)", name, bytes.len());
    cache
        .insert(Namespace::RESOURCE, name, Arc::new(bytes.clone()))
        .await;
    Ok(bytes)
}

/// Content-Type for a file, inferred from its extension
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
