//! HTTP server for the key management service.
//!
//! This module provides the Axum-based HTTP server with:
//! - Application state shared by handlers
//! - Liveness and readiness endpoints
//! - Router configuration

pub mod health;
pub mod routes;
pub mod state;

pub use health::readiness_check;
pub use routes::build_router;
pub use state::AppState;
