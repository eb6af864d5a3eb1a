//! Axum integration for the campus events portal.
//!
//! This crate holds the HTTP shell pieces that are independent of the portal
//! domain: the error type every handler returns, request extractors, the
//! correlation ID middleware, and health endpoints.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** the caller identity and body
//! 3. **Build** a domain action
//! 4. **Dispatch** it through the `Store`
//! 5. **Map** the outcome (or [`AppError`]) to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use campus_web::{AppError, extractors::Identity};
//! use axum::{Json, extract::State};
//!
//! async fn create_event(
//!     State(state): State<AppState>,
//!     caller: Identity<Role>,
//!     Json(request): Json<CreateEventRequest>,
//! ) -> Result<Json<Event>, AppError> {
//!     let event = state.portal.create_event(&caller, request).await?;
//!     Ok(Json(event))
//! }
//! ```

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{ApiJson, CorrelationId, Identity};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
