// ── Topology-bound access control ──
//
// Robots and driver stations are not issued credentials. Each team's
// devices live on their own VLAN, `10.<team / 100>.<team % 100>.0/24`, so
// the source address of a broker connection already says which team it
// belongs to. Authorization is the act of checking that a topic's team
// segment agrees with that address.
//
// Everything here is a pure function of its inputs: no I/O, no shared
// state, and every unparseable input denies.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AclConfig;
use crate::model::TeamNumber;

// ── Subnets ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid subnet '{input}': {reason}")]
pub struct SubnetParseError {
    pub input: String,
    pub reason: String,
}

/// An IPv4 network in CIDR form. The host bits are masked off on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Subnet {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Subnet {
    /// `100.64.0.0/24`, where field infrastructure and operator consoles live.
    pub const MANAGEMENT_DEFAULT: Self = Self {
        network: Ipv4Addr::new(100, 64, 0, 0),
        prefix: 24,
    };

    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, SubnetParseError> {
        if prefix > 32 {
            return Err(SubnetParseError {
                input: format!("{addr}/{prefix}"),
                reason: format!("prefix length must be <= 32, got {prefix}"),
            });
        }
        let network = Ipv4Addr::from(u32::from(addr) & mask(prefix));
        Ok(Self { network, prefix })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix) == u32::from(self.network)
    }
}

fn mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

impl FromStr for Ipv4Subnet {
    type Err = SubnetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| SubnetParseError {
            input: s.to_owned(),
            reason,
        };
        let (host, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| err("expected <address>/<prefix>".into()))?;
        let addr = host
            .parse::<Ipv4Addr>()
            .map_err(|_| err(format!("invalid IPv4 address '{host}'")))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| err(format!("invalid prefix length '{prefix}'")))?;
        Self::new(addr, prefix).map_err(|e| err(e.reason))
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl TryFrom<String> for Ipv4Subnet {
    type Error = SubnetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Subnet> for String {
    fn from(value: Ipv4Subnet) -> Self {
        value.to_string()
    }
}

// ── Identity extraction ──────────────────────────────────────────────

/// A broker client as seen by the hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: String,
    /// Remote address as reported by the broker: `ip:port` or bare `ip`.
    pub remote: String,
}

impl ClientInfo {
    pub fn new(id: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote: remote.into(),
        }
    }

    /// Parsed remote IP, or `None` if the broker handed us garbage.
    pub fn remote_ip(&self) -> Option<IpAddr> {
        let raw = self.remote.trim();
        raw.parse::<SocketAddr>()
            .map(|sa| sa.ip())
            .or_else(|_| raw.parse::<IpAddr>())
            .ok()
    }
}

/// Team implied by the address's VLAN, for IPv4 and IPv4-mapped IPv6 only.
pub fn expected_team(addr: IpAddr) -> Option<TeamNumber> {
    let v4 = match addr {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
    };
    TeamNumber::from_subnet_address(v4)
}

/// Split `robot/<team>/<suffix>` into its team and suffix.
pub fn parse_robot_topic(topic: &str) -> Option<(TeamNumber, &str)> {
    let mut parts = topic.split('/');
    let (Some("robot"), Some(team), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if suffix.is_empty() {
        return None;
    }
    let team = team.parse::<TeamNumber>().ok()?;
    Some((team, suffix))
}

/// Team number a client claims through its id, e.g. `gizmo-ds1234` or
/// `gizmo-1234`. The first matching prefix wins.
pub fn team_from_client_id(id: &str, prefixes: &[String]) -> Option<TeamNumber> {
    prefixes
        .iter()
        .find_map(|p| id.strip_prefix(p.as_str()))
        .and_then(|rest| rest.parse().ok())
}

// ── Decisions ────────────────────────────────────────────────────────

/// Why a request was refused. Logged locally, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    UnparseableAddress,
    /// The address is not IPv4 and does not map to IPv4.
    UnsupportedAddress,
    /// Not of the form `robot/<team>/<suffix>`.
    MalformedTopic,
    /// The address is not on any team VLAN.
    NoTeamForAddress,
    TeamMismatch {
        expected: TeamNumber,
        claimed: TeamNumber,
    },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnparseableAddress => f.write_str("remote address could not be parsed"),
            Self::UnsupportedAddress => f.write_str("remote address is not IPv4"),
            Self::MalformedTopic => f.write_str("topic is not robot/<team>/<suffix>"),
            Self::NoTeamForAddress => f.write_str("remote address is not on a team network"),
            Self::TeamMismatch { expected, claimed } => {
                write!(f, "address belongs to team {expected}, topic names team {claimed}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclDecision {
    /// Loopback or management subnet.
    Privileged,
    /// Address team and topic team agree.
    Matched(TeamNumber),
    Denied(DenyReason),
}

impl AclDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Self::Denied(_))
    }
}

// ── Hook ─────────────────────────────────────────────────────────────

/// Callbacks an embedded broker invokes on client lifecycle events.
pub trait BrokerHook: Send + Sync {
    fn on_connect_authenticate(&self, client: &ClientInfo) -> bool;

    fn on_acl_check(&self, client: &ClientInfo, topic: &str, write: bool) -> bool;

    /// Advisory only; never affects authorization.
    fn on_session_established(&self, _client: &ClientInfo) {}

    fn on_disconnect(&self, _client: &ClientInfo) {}
}

/// The address-correlating hook.
#[derive(Debug, Clone, Default)]
pub struct TopologyHook {
    config: AclConfig,
}

impl TopologyHook {
    pub fn new(config: AclConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    /// Full decision for one access, with the reason on denial.
    pub fn evaluate(&self, client: &ClientInfo, topic: &str) -> AclDecision {
        let Some(ip) = client.remote_ip() else {
            return AclDecision::Denied(DenyReason::UnparseableAddress);
        };
        if self.is_privileged(ip) {
            return AclDecision::Privileged;
        }

        let Some((claimed, _)) = parse_robot_topic(topic) else {
            return AclDecision::Denied(DenyReason::MalformedTopic);
        };
        let v4 = match ip {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4,
                None => return AclDecision::Denied(DenyReason::UnsupportedAddress),
            },
        };
        let Some(expected) = TeamNumber::from_subnet_address(v4) else {
            return AclDecision::Denied(DenyReason::NoTeamForAddress);
        };

        if expected == claimed {
            AclDecision::Matched(claimed)
        } else {
            AclDecision::Denied(DenyReason::TeamMismatch { expected, claimed })
        }
    }

    fn is_privileged(&self, ip: IpAddr) -> bool {
        if ip.is_loopback() {
            return true;
        }
        let v4 = match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(v6) => v6.to_ipv4_mapped(),
        };
        v4.is_some_and(|v4| v4.is_loopback() || self.config.management_subnet.contains(v4))
    }
}

impl BrokerHook for TopologyHook {
    fn on_connect_authenticate(&self, _client: &ClientInfo) -> bool {
        true
    }

    fn on_acl_check(&self, client: &ClientInfo, topic: &str, write: bool) -> bool {
        let decision = self.evaluate(client, topic);
        if let AclDecision::Denied(reason) = decision {
            debug!(client = %client.id, remote = %client.remote, topic, write, %reason, "acl denied");
        }
        decision.is_allowed()
    }

    fn on_session_established(&self, client: &ClientInfo) {
        let Some(claimed) = team_from_client_id(&client.id, &self.config.device_prefixes) else {
            return;
        };
        match client.remote_ip().and_then(expected_team) {
            Some(expected) if expected == claimed => {
                info!(client = %client.id, team = claimed.get(), "device session established");
            }
            Some(expected) => {
                warn!(
                    client = %client.id,
                    remote = %client.remote,
                    expected = expected.get(),
                    claimed = claimed.get(),
                    "device connected from another team's network"
                );
            }
            None => {
                warn!(
                    client = %client.id,
                    remote = %client.remote,
                    claimed = claimed.get(),
                    "device connected from outside any team network"
                );
            }
        }
    }

    fn on_disconnect(&self, client: &ClientInfo) {
        if let Some(team) = team_from_client_id(&client.id, &self.config.device_prefixes) {
            info!(client = %client.id, team = team.get(), "device disconnected");
        }
    }
}
