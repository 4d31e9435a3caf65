use std::sync::Arc;

use crate::config::Config;
use crate::registry::ConnectionRegistry;
use crate::relay::RelaySettings;
use crate::upstream::{RealtimeConnector, UpstreamConnector};

// -----------------------------------------------------------------------------
// ----- AppState --------------------------------------------------------------

/// Everything the front door shares across connections.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub connector: Arc<dyn UpstreamConnector>,
    pub relay: RelaySettings,

    /// Reported by the status endpoint.
    pub port: u16,
}

impl AppState {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        connector: Arc<dyn UpstreamConnector>,
        relay: RelaySettings,
        port: u16,
    ) -> Self {
        Self {
            registry,
            connector,
            relay,
            port,
        }
    }

    /// Production wiring: realtime sessions built from the upstream config.
    /// `port` is the bound one, which differs from `config.port` for port 0.
    pub fn from_config(config: &Config, port: u16) -> Self {
        Self::new(
            ConnectionRegistry::new(),
            Arc::new(RealtimeConnector::new(config.upstream.clone())),
            RelaySettings {
                connect_timeout: config.upstream.connect_timeout,
            },
            port,
        )
    }
}
