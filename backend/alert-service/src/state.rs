use std::sync::Arc;

use crate::config::Config;
use crate::store::AlertStore;
use crate::websocket::{AlertBroadcaster, ConnectionRegistry};

/// Shared application state, constructed once at startup and injected into
/// handlers. The store and registry are the only shared mutable resources.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AlertStore>,
    pub registry: ConnectionRegistry,
    pub broadcaster: AlertBroadcaster,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn AlertStore>, config: Config) -> Self {
        let registry = ConnectionRegistry::new();
        let broadcaster = AlertBroadcaster::new(registry.clone());
        Self {
            store,
            registry,
            broadcaster,
            config: Arc::new(config),
        }
    }
}
