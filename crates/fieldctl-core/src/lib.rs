//! Control-plane core for competition fields.
//!
//! This crate owns the state and policy that bind teams, driver inputs
//! and network topology together while matches run:
//!
//! - **[`MappingStore`]**: the team location mapper. Holds the current and
//!   staged team → location mappings, swaps them atomically, and asks a
//!   [`NetworkConfigurator`] to bring the field network in line afterwards.
//!
//! - **[`TopologyHook`]**: broker authorization by address correlation. A
//!   client on `10.<t / 100>.<t % 100>.x` may only touch `robot/<t>/...`.
//!
//! - **[`Pusher`]**: periodic control and location distribution. Reads the
//!   current mapping each tick and publishes per-team frames through a
//!   [`Publisher`].
//!
//! - **[`EventHub`]**: bounded fan-out of operational [`Event`]s with slow
//!   consumer eviction.
//!
//! Transport bindings (HTTP, websocket, MQTT) live in `fieldctl-server`.
//! Nothing here reads files or environment; callers pass configuration in.

pub mod acl;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod model;
pub mod pusher;
pub mod tlm;

// ── Primary re-exports ──────────────────────────────────────────────
pub use acl::{AclDecision, BrokerHook, ClientInfo, DenyReason, Ipv4Subnet, TopologyHook};
pub use config::{AclConfig, EventStreamConfig, PusherConfig};
pub use error::{InputError, PublishError, ReconcileError, TlmError};
pub use events::{Event, EventHub, EventPublisher, EventType, Subscription};
pub use input::{InputSource, InputTable};
pub use pusher::{Delivery, Publisher, Pusher, TickReport};
pub use tlm::{
    CommandConfigurator, LogExporter, MappingStore, MatchExporter, NetworkConfigurator,
    NullConfigurator, NullExporter, TeamLocationMapper,
};

pub use model::{
    ControlFrame, FieldLocation, LocationConflict, LocationFrame, LocationParseError, Mapping,
    Quadrant, TeamNumber, TeamNumberError,
};
