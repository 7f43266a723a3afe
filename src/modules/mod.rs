//! Handler modules linked into the server

pub mod api;

use crate::handler::ModuleLibrary;

/// Library with every bundled module registered
pub fn default_library() -> ModuleLibrary {
    let mut library = ModuleLibrary::new();
    library.register(api::MODULE_NAME, api::exports());
    library
}
