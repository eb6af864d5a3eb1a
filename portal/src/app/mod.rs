//! Application layer.
//!
//! - [`coordinator`]: startup wiring (event log, replay, store)
//! - [`services`]: role checks and command dispatch
//! - [`queries`]: read-only projections served over HTTP

pub mod coordinator;
pub mod queries;
pub mod services;

pub use coordinator::{PortalApp, StartupError};
pub use services::{Caller, MarkAttendanceRequest, PortalService, PortalStore, RegistrationRequest};
