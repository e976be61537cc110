// ── PC Scoring Manager integration ──
//
// The scoring manager posts its own match document when a match is
// queued. Converting it into a mapping lets operators skip retyping
// assignments.

use fieldctl_core::{FieldLocation, LocationParseError, Mapping, Quadrant, TeamNumber};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PcsmMatch {
    #[serde(rename = "matchNumber")]
    pub number: u32,
    #[serde(rename = "Fields", default)]
    pub fields: Vec<PcsmField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PcsmField {
    #[serde(rename = "fieldNumber")]
    pub number: u32,
    #[serde(rename = "Teams", default)]
    pub teams: Vec<PcsmTeam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PcsmTeam {
    #[serde(rename = "teamNumber")]
    pub number: u32,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Quadrant")]
    pub quadrant: String,
}

impl PcsmMatch {
    /// Build a mapping from the match. Empty slots (team 0) are skipped.
    pub fn to_mapping(&self) -> Result<Mapping, LocationParseError> {
        let mut mapping = Mapping::new();
        for field in &self.fields {
            for team in &field.teams {
                let Ok(number) = TeamNumber::new(team.number) else {
                    continue;
                };
                let quadrant: Quadrant = team.quadrant.parse()?;
                mapping.insert(number, FieldLocation::new(field.number, quadrant)?);
            }
        }
        Ok(mapping)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MATCH: &str = r#"{
        "matchNumber": 14,
        "Fields": [
            {"fieldNumber": 1, "Teams": [
                {"teamNumber": 7, "Name": "Gearheads", "Quadrant": "RED"},
                {"teamNumber": 0, "Name": "", "Quadrant": "BLUE"},
                {"teamNumber": 12, "Name": "Sprockets", "Quadrant": "Green"}
            ]},
            {"fieldNumber": 2, "Teams": [
                {"teamNumber": 1234, "Name": "Bolts", "Quadrant": "yellow"}
            ]}
        ]
    }"#;

    #[test]
    fn converts_match_and_skips_empty_slots() {
        let m: PcsmMatch = serde_json::from_str(MATCH).unwrap();
        assert_eq!(m.number, 14);

        let mapping = m.to_mapping().unwrap();
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"7": "field1:red", "12": "field1:green", "1234": "field2:yellow"})
        );
    }

    #[test]
    fn unknown_quadrant_is_rejected() {
        let m: PcsmMatch = serde_json::from_str(
            r#"{"matchNumber": 1, "Fields": [{"fieldNumber": 1, "Teams": [
                {"teamNumber": 7, "Name": "x", "Quadrant": "PURPLE"}]}]}"#,
        )
        .unwrap();
        assert!(m.to_mapping().is_err());
    }
}
