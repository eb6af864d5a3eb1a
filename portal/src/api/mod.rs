//! HTTP handlers, one module per resource.

pub mod attendance;
pub mod dashboard;
pub mod events;
pub mod leaderboard;
pub mod od_requests;
pub mod registrations;
pub mod reports;
pub mod sub_users;
