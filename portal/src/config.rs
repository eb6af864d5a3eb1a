//! Configuration management for the portal.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Event log configuration
    pub storage: StorageConfig,
    /// Portal behaviour
    pub portal: PortalConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Event log configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON-lines event log
    pub event_log: String,
}

/// Portal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base of the check-in URL; the event ID is appended
    pub checkin_base_url: String,
    /// Events returned by a list query without `limit`
    pub events_default_limit: usize,
    /// Largest accepted `limit` on event lists
    pub events_max_limit: usize,
    /// Leaderboard size without `limit`
    pub leaderboard_default_limit: usize,
    /// Largest accepted `limit` on OD request lists
    pub od_max_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                log_level: "info".to_string(),
                shutdown_timeout: 30,
            },
            storage: StorageConfig {
                event_log: "data/events.jsonl".to_string(),
            },
            portal: PortalConfig {
                checkin_base_url: "https://campus-memory.app/checkin".to_string(),
                events_default_limit: 50,
                events_max_limit: 200,
                leaderboard_default_limit: 10,
                od_max_limit: 200,
            },
        }
    }
}

fn var_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn string_or(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server: ServerConfig {
                host: string_or("HOST", defaults.server.host),
                port: var_or("PORT", defaults.server.port),
                log_level: string_or("RUST_LOG", defaults.server.log_level),
                shutdown_timeout: var_or("SHUTDOWN_TIMEOUT", defaults.server.shutdown_timeout),
            },
            storage: StorageConfig {
                event_log: string_or("PORTAL_EVENT_LOG", defaults.storage.event_log),
            },
            portal: PortalConfig {
                checkin_base_url: string_or("CHECKIN_BASE_URL", defaults.portal.checkin_base_url)
                    .trim_end_matches('/')
                    .to_string(),
                events_default_limit: var_or(
                    "EVENTS_DEFAULT_LIMIT",
                    defaults.portal.events_default_limit,
                ),
                events_max_limit: var_or("EVENTS_MAX_LIMIT", defaults.portal.events_max_limit),
                leaderboard_default_limit: var_or(
                    "LEADERBOARD_DEFAULT_LIMIT",
                    defaults.portal.leaderboard_default_limit,
                ),
                od_max_limit: var_or("OD_MAX_LIMIT", defaults.portal.od_max_limit),
            },
        }
    }

    /// Socket address string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Shutdown timeout as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }
}
