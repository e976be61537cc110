// ── Mapping snapshots ──
//
// A mapping associates each team with the location it drives from.
// Snapshots are immutable by convention once handed out by the store;
// the store shares them behind `Arc` and swaps whole snapshots.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use super::{FieldLocation, TeamNumber};

/// Team → location association at one point in time.
///
/// Serializes as a JSON object keyed by team number, e.g.
/// `{"7": "field1:red", "12": "field1:blue"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping(BTreeMap<TeamNumber, FieldLocation>);

/// Two or more teams assigned to the same location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConflict {
    pub location: FieldLocation,
    pub teams: Vec<TeamNumber>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, team: TeamNumber) -> Option<FieldLocation> {
        self.0.get(&team).copied()
    }

    pub fn insert(&mut self, team: TeamNumber, location: FieldLocation) -> Option<FieldLocation> {
        self.0.insert(team, location)
    }

    pub fn remove(&mut self, team: TeamNumber) -> Option<FieldLocation> {
        self.0.remove(&team)
    }

    pub fn contains(&self, team: TeamNumber) -> bool {
        self.0.contains_key(&team)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Teams in ascending order.
    pub fn teams(&self) -> Vec<TeamNumber> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TeamNumber, FieldLocation)> + '_ {
        self.0.iter().map(|(t, l)| (*t, *l))
    }

    /// The team currently assigned to `location`, if any.
    pub fn occupant(&self, location: FieldLocation) -> Option<TeamNumber> {
        self.0
            .iter()
            .find_map(|(team, loc)| (*loc == location).then_some(*team))
    }

    /// Locations claimed by more than one team.
    ///
    /// The store does not reject these; boundary code uses this to refuse
    /// inconsistent snapshots before they reach the store.
    pub fn conflicts(&self) -> Vec<LocationConflict> {
        let mut by_location: BTreeMap<FieldLocation, Vec<TeamNumber>> = BTreeMap::new();
        for (team, location) in &self.0 {
            by_location.entry(*location).or_default().push(*team);
        }
        by_location
            .into_iter()
            .filter(|(_, teams)| teams.len() > 1)
            .map(|(location, teams)| LocationConflict { location, teams })
            .collect()
    }
}

impl FromIterator<(TeamNumber, FieldLocation)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (TeamNumber, FieldLocation)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<TeamNumber, FieldLocation>> for Mapping {
    fn from(map: BTreeMap<TeamNumber, FieldLocation>) -> Self {
        Self(map)
    }
}

impl IntoIterator for Mapping {
    type Item = (TeamNumber, FieldLocation);
    type IntoIter = btree_map::IntoIter<TeamNumber, FieldLocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn team(n: u32) -> TeamNumber {
        TeamNumber::new(n).unwrap()
    }

    fn loc(s: &str) -> FieldLocation {
        s.parse().unwrap()
    }

    #[test]
    fn json_is_keyed_by_team_number() {
        let m: Mapping = [(team(7), loc("field1:red")), (team(12), loc("field1:blue"))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"7":"field1:red","12":"field1:blue"}"#);

        let back: Mapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn rejects_zero_team_and_bad_location_in_json() {
        assert!(serde_json::from_str::<Mapping>(r#"{"0":"field1:red"}"#).is_err());
        assert!(serde_json::from_str::<Mapping>(r#"{"5":"field1:mauve"}"#).is_err());
        assert!(serde_json::from_str::<Mapping>(r#"{"five":"field1:red"}"#).is_err());
    }

    #[test]
    fn occupant_finds_team() {
        let m: Mapping = [(team(7), loc("field1:red"))].into_iter().collect();
        assert_eq!(m.occupant(loc("field1:red")), Some(team(7)));
        assert_eq!(m.occupant(loc("field1:blue")), None);
    }

    #[test]
    fn conflicts_reports_shared_locations() {
        let m: Mapping = [
            (team(1), loc("field1:red")),
            (team(2), loc("field1:red")),
            (team(3), loc("field1:blue")),
        ]
        .into_iter()
        .collect();

        let conflicts = m.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].location, loc("field1:red"));
        assert_eq!(conflicts[0].teams, vec![team(1), team(2)]);
    }
}
