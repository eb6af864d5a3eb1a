//! Application coordinator: startup wiring of the portal.

use super::services::PortalService;
use crate::aggregates::PortalEnvironment;
use crate::config::Config;
use crate::persistence::{FileEventStore, replay};
use campus_core::environment::{Clock, SystemClock};
use campus_core::event_store::{EventStore, EventStoreError};
use std::sync::Arc;
use thiserror::Error;

/// Startup errors.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The event log could not be opened or replayed
    #[error("Event log error: {0}")]
    EventLog(#[from] EventStoreError),
}

/// The running portal: event log plus the service built on it.
pub struct PortalApp {
    /// Durable event log
    pub event_store: Arc<FileEventStore>,
    /// Command and query service
    pub service: PortalService,
}

impl PortalApp {
    /// Open the event log, rebuild state and start the store.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::EventLog`] if the log cannot be opened or an
    /// event cannot be replayed.
    pub async fn new(config: &Config) -> Result<Self, StartupError> {
        let event_store = Arc::new(FileEventStore::open(&config.storage.event_log).await?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_store(event_store, clock, config).await
    }

    /// Same as [`PortalApp::new`] with an explicit store and clock.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::EventLog`] if replay fails.
    pub async fn with_store(
        event_store: Arc<FileEventStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Result<Self, StartupError> {
        let dyn_store: Arc<dyn EventStore> = event_store.clone();
        let env = PortalEnvironment::new(clock, dyn_store);

        let state = replay(event_store.as_ref(), &env).await?;
        let service = PortalService::with_state(state, env, config.portal.clone());

        Ok(Self {
            event_store,
            service,
        })
    }
}
