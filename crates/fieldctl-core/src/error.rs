// ── Core error types ──
//
// Each collaborator seam gets its own error enum so callers can tell a
// normal lookup miss apart from a downstream failure. None of these are
// fatal to the process; the worst case is one team or one connection.

use std::time::Duration;

use thiserror::Error;

use crate::model::{FieldLocation, TeamNumber};

/// Errors from the team location mapper.
#[derive(Debug, Error)]
pub enum TlmError {
    /// The team is not in the current snapshot. Expected while robots
    /// wait for their match to be mapped.
    #[error("no mapping for team {team}")]
    NoMapping { team: TeamNumber },

    #[error("no staged mapping to commit")]
    NothingStaged,

    #[error("{location} is already staged for team {occupant}")]
    LocationOccupied {
        location: FieldLocation,
        occupant: TeamNumber,
    },

    /// The mapping change took effect, but the network did not follow.
    /// Operators recover with an explicit reconcile.
    #[error("mapping applied but network reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl TlmError {
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Self::NoMapping { .. })
    }
}

/// Failures reported by a network configurator.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to synchronize declared network state: {message}")]
    Sync { message: String },

    #[error("failed to converge network devices: {message}")]
    Converge { message: String },

    #[error("network command '{command}' exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The command was killed after running past its deadline.
    #[error("network command '{command}' did not finish within {}s", after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reading driver input for a location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("no controller bound to {location}")]
    Unbound { location: FieldLocation },

    #[error("controller for {location} has not reported any state yet")]
    NoState { location: FieldLocation },
}

/// Failures handing a frame to the broker.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode payload for {topic}: {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("broker rejected publish to {topic}: {message}")]
    Broker { topic: String, message: String },

    #[error("publish to {topic} timed out")]
    Timeout { topic: String },
}
