//! URL to filesystem path resolution
//!
//! All path handling here is lexical. A URL is decoded, joined to the
//! resource root and normalised before anything touches the filesystem, and
//! the result must still lie inside the root.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::trace;

use crate::error::{Result, ServeError};

/// Outcome of resolving a URL against the resource root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Filesystem path, after directory index fallback
    pub path: PathBuf,
    /// Whether `path` is a regular file
    pub exists: bool,
}

/// Decode `%XX` escapes in a URL path
pub fn decode_url_path(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ServeError::InvalidPath(raw.to_string()))
}

/// Lexically normalise a path: drop `.`, fold `..` into its parent and
/// collapse repeated separators. `..` at the filesystem root stays at the
/// root; leading `..` of a relative path is kept.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Join a decoded URL path onto `root`, rejecting anything that escapes it
pub fn join_under_root(root: &Path, url_path: &str) -> Result<PathBuf> {
    let root = clean_path(root);
    let relative = url_path.trim_start_matches('/');
    let candidate = clean_path(&root.join(relative));

    let inside = if root == Path::new(".") {
        !matches!(
            candidate.components().next(),
            Some(Component::ParentDir) | Some(Component::RootDir)
        )
    } else {
        candidate.starts_with(&root)
    };

    if !inside {
        return Err(ServeError::InvalidPath(url_path.to_string()));
    }
    Ok(candidate)
}

/// Resolve a raw request path to a file under `root`
///
/// A directory resolves to its first existing index file. A directory with
/// no index file resolves to the directory itself and does not exist.
pub async fn resolve_url(root: &Path, raw_path: &str, index_files: &[String]) -> Result<ResolvedPath> {
    let decoded = decode_url_path(raw_path)?;
    let path = join_under_root(root, &decoded)?;

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(ResolvedPath { path, exists: true }),
        Ok(meta) if meta.is_dir() => {
            for index in index_files {
                let candidate = path.join(index);
                if let Ok(meta) = tokio::fs::metadata(&candidate).await {
                    if meta.is_file() {
                        trace!("Directory {} served by {}", path.display(), index);
                        return Ok(ResolvedPath {
                            path: candidate,
                            exists: true,
                        });
                    }
                }
            }
            Ok(ResolvedPath {
                path,
                exists: false,
            })
        }
        _ => Ok(ResolvedPath {
            path,
            exists: false,
        }),
    }
}
