// ── Runtime component configuration ──
//
// Plain structs handed to component constructors. The binary builds them
// from the loaded config file; core never reads config files itself.

use std::time::Duration;

use crate::acl::Ipv4Subnet;

/// Timing for the distribution pusher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PusherConfig {
    /// How often control frames go out (default 40ms, 25Hz).
    pub control_period: Duration,
    /// How often location frames go out (default 5s).
    pub location_period: Duration,
    /// Upper bound on a single publish before it is abandoned.
    pub publish_timeout: Duration,
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            control_period: Duration::from_millis(40),
            location_period: Duration::from_secs(5),
            publish_timeout: Duration::from_millis(500),
        }
    }
}

/// Backpressure policy for the event broadcast hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStreamConfig {
    /// Undelivered messages a subscriber may hold before it is evicted.
    pub queue_depth: usize,
    /// Deadline for one websocket write.
    pub write_timeout: Duration,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            queue_depth: 16,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Inputs to the topology-bound ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclConfig {
    /// Clients in this range may touch any team's topics.
    pub management_subnet: Ipv4Subnet,
    /// Client-id prefixes stripped before reading a claimed team number.
    /// Checked in order, so longer prefixes belong first.
    pub device_prefixes: Vec<String>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            management_subnet: Ipv4Subnet::MANAGEMENT_DEFAULT,
            device_prefixes: vec!["gizmo-ds".into(), "gizmo-".into()],
        }
    }
}
