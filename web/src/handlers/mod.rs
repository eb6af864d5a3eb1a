//! HTTP request handlers shared by every service.

pub mod health;

pub use health::{health_check, health_check_with_store, readiness_response};
