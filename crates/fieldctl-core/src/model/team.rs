// ── Team identity ──
//
// Team numbers are the primary key across the whole control plane and
// are baked into the network plan: team T lives in 10.(T/100).(T%100).0/24.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A positive, event-unique team number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TeamNumber(u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamNumberError {
    #[error("team number must be positive")]
    Zero,

    #[error("invalid team number '{0}'")]
    Invalid(String),
}

impl TeamNumber {
    pub fn new(raw: u32) -> Result<Self, TeamNumberError> {
        if raw == 0 {
            return Err(TeamNumberError::Zero);
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Decode the team encoded in a team-subnet address.
    ///
    /// The second octet carries the hundreds, the third carries the
    /// remainder: `10.1.23.x` belongs to team 123. Returns `None` for
    /// addresses that decode to zero.
    pub fn from_subnet_address(addr: Ipv4Addr) -> Option<Self> {
        let [_, hundreds, rest, _] = addr.octets();
        Self::new(u32::from(hundreds) * 100 + u32::from(rest)).ok()
    }

    /// The robot's well-known address inside its team subnet.
    pub fn robot_address(self) -> Ipv4Addr {
        let hundreds = u8::try_from(self.0 / 100).unwrap_or(u8::MAX);
        let rest = u8::try_from(self.0 % 100).unwrap_or_default();
        Ipv4Addr::new(10, hundreds, rest, 2)
    }
}

impl fmt::Display for TeamNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TeamNumber {
    type Err = TeamNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<u32>()
            .map_err(|_| TeamNumberError::Invalid(s.to_owned()))?;
        Self::new(raw)
    }
}

impl TryFrom<u32> for TeamNumber {
    type Error = TeamNumberError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<TeamNumber> for u32 {
    fn from(team: TeamNumber) -> Self {
        team.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(TeamNumber::new(0), Err(TeamNumberError::Zero));
        assert!("0".parse::<TeamNumber>().is_err());
    }

    #[test]
    fn parses_padded_numbers() {
        let team: TeamNumber = "0042".parse().unwrap();
        assert_eq!(team.get(), 42);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            "forty".parse::<TeamNumber>(),
            Err(TeamNumberError::Invalid(_))
        ));
    }

    #[test]
    fn subnet_address_round_trips_through_robot_address() {
        for raw in [1, 42, 99, 100, 123, 1234, 9999] {
            let team = TeamNumber::new(raw).unwrap();
            assert_eq!(
                TeamNumber::from_subnet_address(team.robot_address()),
                Some(team)
            );
        }
    }

    #[test]
    fn subnet_decoding_uses_middle_octets() {
        let addr = Ipv4Addr::new(10, 12, 34, 17);
        assert_eq!(
            TeamNumber::from_subnet_address(addr).map(TeamNumber::get),
            Some(1234)
        );
    }

    #[test]
    fn subnet_decoding_of_zero_is_none() {
        assert_eq!(TeamNumber::from_subnet_address(Ipv4Addr::new(10, 0, 0, 2)), None);
    }
}
