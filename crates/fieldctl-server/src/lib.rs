//! Transport bindings for the field control plane.
//!
//! - [`router`] builds the axum HTTP surface over a [`MappingStore`], the
//!   driver [`InputTable`], the broker ACL hook and
//!   [`EventHub`](fieldctl_core::EventHub).
//! - [`serve`] runs a router with a bounded graceful shutdown.
//! - [`MqttPublisher`] feeds the distribution pusher into an MQTT broker.
//! - [`FieldServer`] wires all of it together for the `serve` command.

pub mod broker_auth;
pub mod error;
pub mod eventstream;
pub mod handlers;
pub mod mqtt;
pub mod pcsm;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use fieldctl_core::{
    AclConfig, EventHub, EventStreamConfig, InputTable, MappingStore, MatchExporter,
    NetworkConfigurator, Pusher, PusherConfig, TopologyHook,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{AppError, ServerError};
pub use mqtt::{BrokerConfig, MqttPublisher};
pub use state::AppState;

use crate::handlers::{
    bind_controller, clear_stage, commit_stage, configured_quads, controller_binding,
    current_map, metrics_sd, reconcile, remap_immediate, remap_pcsm, replace_stage, stage_assign,
    stage_from_current, stage_remove, staged_map, team_location, unbind_controller, update_input,
};

/// Build the HTTP control-plane router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/map/current", get(current_map))
        .route("/map/team/:team", get(team_location))
        .route("/map/immediate", post(remap_immediate))
        .route("/map/pcsm", post(remap_pcsm))
        .route(
            "/map/stage",
            get(staged_map).post(replace_stage).delete(clear_stage),
        )
        .route("/map/stage/from-current", post(stage_from_current))
        .route("/map/stage/:team", put(stage_assign).delete(stage_remove))
        .route("/map/commit-stage", post(commit_stage))
        .route("/field/configured-quads", get(configured_quads))
        .route("/field/bind", post(bind_controller))
        .route(
            "/field/bind/:location",
            get(controller_binding).delete(unbind_controller),
        )
        .route("/input/:location", put(update_input))
        .route("/broker/authn", post(broker_auth::authenticate))
        .route("/broker/acl", post(broker_auth::authorize))
        .route("/net/reconcile", post(reconcile))
        .route("/eventstream", get(eventstream::event_stream));

    Router::new()
        .nest("/api", api)
        .route("/metrics-sd", get(metrics_sd))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` until `shutdown` fires, then give in-flight requests
/// `grace` to finish before forcing the listener closed.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> Result<(), ServerError> {
    let signal = shutdown.clone();
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { signal.cancelled().await });
    let mut task = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut task => return Ok(result??),
        () = shutdown.cancelled() => {}
    }

    match tokio::time::timeout(grace, &mut task).await {
        Ok(result) => Ok(result??),
        Err(_) => {
            warn!(grace_ms = grace.as_millis(), "shutdown grace period elapsed, forcing close");
            task.abort();
            Ok(())
        }
    }
}

/// Everything the `serve` command runs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub shutdown_grace: Duration,
    pub fields: Vec<u32>,
    pub pcsm_enabled: bool,
    pub events: EventStreamConfig,
    pub pusher: PusherConfig,
    pub acl: AclConfig,
    /// No broker means no distribution pusher.
    pub broker: Option<BrokerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            shutdown_grace: Duration::from_secs(5),
            fields: vec![1],
            pcsm_enabled: false,
            events: EventStreamConfig::default(),
            pusher: PusherConfig::default(),
            acl: AclConfig::default(),
            broker: Some(BrokerConfig::default()),
        }
    }
}

/// The assembled control plane.
pub struct FieldServer {
    config: ServerConfig,
    store: Arc<MappingStore>,
    events: EventHub,
    input: Arc<InputTable>,
}

impl FieldServer {
    pub fn new(
        config: ServerConfig,
        network: Arc<dyn NetworkConfigurator>,
        exporter: Arc<dyn MatchExporter>,
    ) -> Self {
        let events = EventHub::new(&config.events);
        Self {
            store: Arc::new(MappingStore::new(network, exporter)),
            events,
            input: Arc::new(InputTable::new()),
            config,
        }
    }

    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn input(&self) -> &Arc<InputTable> {
        &self.input
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind,
                source,
            })?;
        self.run_on(listener, shutdown).await
    }

    /// Run on an already-bound listener.
    pub async fn run_on(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;

        let distribution = self.config.broker.as_ref().map(|broker| {
            // Not a child of `shutdown`: the broker driver must outlive the
            // pusher's last tick.
            let cancel = CancellationToken::new();
            let (publisher, driver) = MqttPublisher::connect(broker, cancel.clone());
            let pusher = Arc::new(Pusher::new(
                self.store.clone(),
                self.input.clone(),
                Arc::new(publisher),
                self.config.pusher.clone(),
            ));
            pusher.start();
            Distribution {
                pusher,
                driver,
                cancel,
            }
        });

        let state = AppState::new(
            self.store.clone(),
            self.events.clone(),
            &self.config.fields,
            &self.config.events,
        )
        .with_pcsm(self.config.pcsm_enabled)
        .with_input(self.input.clone())
        .with_acl(Arc::new(TopologyHook::new(self.config.acl.clone())))
        .with_shutdown(shutdown.clone());

        info!(%addr, "control plane listening");
        let result = serve(listener, router(state), shutdown, self.config.shutdown_grace).await;

        if let Some(distribution) = distribution {
            distribution.shutdown().await;
        }
        info!("control plane stopped");
        result
    }
}

/// The pusher and the broker driver it publishes through.
struct Distribution {
    pusher: Arc<Pusher>,
    driver: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Distribution {
    /// Stop the pusher first so its last tick still reaches a live event
    /// loop, then stop the driver.
    async fn shutdown(self) {
        self.pusher.stop().await;
        self.cancel.cancel();
        let _ = self.driver.await;
    }
}
