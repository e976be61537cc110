//! Domain model shared by every control-plane component.

pub mod frame;
pub mod location;
pub mod mapping;
pub mod team;

pub use frame::{ControlFrame, LocationFrame};
pub use location::{FieldLocation, LocationParseError, Quadrant};
pub use mapping::{LocationConflict, Mapping};
pub use team::{TeamNumber, TeamNumberError};
