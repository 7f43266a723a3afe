//! Request routing
//!
//! Maps request URLs onto the resource tree and picks the handler binding
//! that serves each resolved path.

pub mod binding;
pub mod path;

pub use binding::resolve_binding;
pub use path::{resolve_url, ResolvedPath};
