use std::sync::Arc;
use std::time::Duration;

use fieldctl_core::{
    BrokerHook, EventHub, EventStreamConfig, FieldLocation, InputTable, MappingStore, TopologyHook,
};
use tokio_util::sync::CancellationToken;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MappingStore>,
    pub events: EventHub,
    /// Controller bindings and latest driver input, read by the pusher.
    pub input: Arc<InputTable>,
    /// Decides broker connect and topic access.
    pub acl: Arc<dyn BrokerHook>,
    /// Field ids whose quadrants are in play.
    pub fields: Arc<[u32]>,
    pub pcsm_enabled: bool,
    pub write_timeout: Duration,
    /// Cancelled when the server begins shutting down; long-lived
    /// connections watch it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<MappingStore>,
        events: EventHub,
        fields: &[u32],
        events_config: &EventStreamConfig,
    ) -> Self {
        Self {
            store,
            events,
            input: Arc::new(InputTable::new()),
            acl: Arc::new(TopologyHook::default()),
            fields: Arc::from(fields),
            pcsm_enabled: false,
            write_timeout: events_config.write_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_pcsm(mut self, enabled: bool) -> Self {
        self.pcsm_enabled = enabled;
        self
    }

    pub fn with_input(mut self, input: Arc<InputTable>) -> Self {
        self.input = input;
        self
    }

    pub fn with_acl(mut self, acl: Arc<dyn BrokerHook>) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Every configured driver position.
    pub fn configured_locations(&self) -> Vec<FieldLocation> {
        FieldLocation::all_on(&self.fields)
    }
}
