//! Campus events portal.
//!
//! Universities run many events at once: workshops, hackathons, seminars,
//! cultural fests. This crate is the backend that lets faculty publish them,
//! students register, coordinators take attendance and staff review on-duty
//! (OD) requests for the classes students miss.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum) ──► api handlers ──► PortalService ──► Store<PortalState>
//!                                        │                    │
//!                                  role checks           PortalReducer
//!                                        │                    │
//!                                 read projections     append_events effect
//!                                 (stats, leaderboard,        │
//!                                  dashboards, CSV)           ▼
//!                                                      FileEventStore (JSONL)
//! ```
//!
//! Every state change is a domain event. The reducer validates a command,
//! applies the resulting event to [`types::PortalState`] and emits an effect
//! that appends the event to the log. On startup the log is replayed through
//! the same reducer, so the in-memory state is always a fold of the log.
//!
//! # Key Invariants
//!
//! - An event never has more approved registrations than `max_participants`
//! - A student has at most one registration and one attendance record per event
//! - Attendance is only recorded for approved registrations
//! - Points are derived from attendance and never stored
//!
//! # Modules
//!
//! - [`types`]: domain types and the root state
//! - [`aggregates`]: reducers for events, registrations, attendance and OD requests
//! - [`stats`], [`leaderboard`], [`dashboard`], [`export`]: read-side projections
//! - [`import`]: the attendance CSV upload parser
//! - [`persistence`]: the JSON-lines event log and replay
//! - [`app`]: service layer used by the HTTP handlers
//! - [`api`], [`server`]: the HTTP surface
//! - [`config`]: environment configuration

pub mod aggregates;
pub mod api;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod import;
pub mod leaderboard;
pub mod persistence;
pub mod server;
pub mod stats;
pub mod types;

pub use app::{PortalApp, PortalService, StartupError};
pub use config::Config;
pub use error::PortalError;
pub use server::{AppState, build_router};
