//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with status endpoints
//! - Catch-all handler feeding the dispatcher
//! - Request body limits and timeouts
//! - Redirect listeners

pub mod handlers;
pub mod redirect;
pub mod routes;

pub use redirect::{create_redirect_router, spawn_redirect_listeners};
pub use routes::create_router;
