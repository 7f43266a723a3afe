//! Binding resolution
//!
//! Picks the most specific binding whose prefix contains a resolved
//! filesystem path. Matching works on whole path segments, so a binding for
//! `/index/` never claims `/index_other/...`.

use std::path::{Component, Path, PathBuf};

use crate::config::Binding;

use super::path::clean_path;

/// Filesystem location a binding prefix covers
pub fn bound_path(root: &Path, prefix: &str) -> PathBuf {
    clean_path(&root.join(prefix.trim_start_matches('/')))
}

/// Path segments, without `.`
///
/// A cleaned relative root is `"."` while paths below it carry no leading
/// `.`, so it must not count as a segment.
fn segments(path: &Path) -> impl Iterator<Item = Component<'_>> {
    path.components().filter(|c| !matches!(c, Component::CurDir))
}

/// Number of leading path segments `a` and `b` share
pub fn common_prefix_len(a: &Path, b: &Path) -> usize {
    segments(a)
        .zip(segments(b))
        .take_while(|(x, y)| x == y)
        .count()
}

/// Find the binding serving `fs_path`
///
/// Bindings are ranked by how many segments they share with the path. The
/// first one in that order whose whole prefix matched wins; equal ranks keep
/// configuration order.
pub fn resolve_binding<'a>(bindings: &'a [Binding], root: &Path, fs_path: &Path) -> Option<&'a Binding> {
    let target = clean_path(fs_path);

    let mut ranked: Vec<(usize, usize, &Binding)> = bindings
        .iter()
        .map(|binding| {
            let bound = bound_path(root, &binding.prefix);
            let full = segments(&bound).count();
            (common_prefix_len(&bound, &target), full, binding)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    ranked
        .into_iter()
        .find(|(matched, full, _)| matched == full)
        .map(|(_, _, binding)| binding)
}
