//! HTTP adapter.
//!
//! Axum routes, handlers, and DTOs for the public API surface.

mod dto;
mod handlers;
mod routes;

pub use handlers::AppState;
pub use routes::{cors_layer, router};
