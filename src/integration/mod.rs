//! Integration tests driving the full router

mod e2e;
mod fixtures;
