//! HTTP server module for the portal.
//!
//! This module provides the Axum-based HTTP server with:
//! - Application state
//! - Health and metrics endpoints
//! - Router configuration

pub mod health;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
