// fieldctl-api: async client for the field control-plane API (HTTP + event stream)

pub mod client;
pub mod error;
pub mod stream;

pub use client::{ControllerBinding, FieldClient, TargetGroup, TeamLocation};
pub use error::Error;
pub use stream::EventStream;
