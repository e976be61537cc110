// ── Field locations ──
//
// A location is a (field, quadrant) pair. On the wire and in every JSON
// payload it is the string `field<N>:<quadrant>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the four fixed driver positions on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quadrant {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [Self::Red, Self::Blue, Self::Green, Self::Yellow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            _ => Err(LocationParseError::UnknownQuadrant(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationParseError {
    #[error("location '{0}' is not of the form field<N>:<quadrant>")]
    Malformed(String),

    #[error("field index in '{0}' must be a positive integer")]
    InvalidField(String),

    #[error("unknown quadrant '{0}' (expected red, blue, green or yellow)")]
    UnknownQuadrant(String),
}

/// A single driver position: field index (1-based) plus quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldLocation {
    field: u32,
    quadrant: Quadrant,
}

impl FieldLocation {
    pub fn new(field: u32, quadrant: Quadrant) -> Result<Self, LocationParseError> {
        if field == 0 {
            return Err(LocationParseError::InvalidField(format!("field{field}")));
        }
        Ok(Self { field, quadrant })
    }

    pub fn field(&self) -> u32 {
        self.field
    }

    pub fn quadrant(&self) -> Quadrant {
        self.quadrant
    }

    /// Every location on the given fields, in field then quadrant order.
    pub fn all_on(fields: &[u32]) -> Vec<Self> {
        fields
            .iter()
            .filter(|&&f| f > 0)
            .flat_map(|&field| {
                Quadrant::ALL
                    .into_iter()
                    .map(move |quadrant| Self { field, quadrant })
            })
            .collect()
    }
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field{}:{}", self.field, self.quadrant)
    }
}

impl FromStr for FieldLocation {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field_part, quadrant_part) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| LocationParseError::Malformed(s.to_owned()))?;

        let index = field_part
            .strip_prefix("field")
            .ok_or_else(|| LocationParseError::Malformed(s.to_owned()))?;
        let field = index
            .parse::<u32>()
            .ok()
            .filter(|f| *f > 0)
            .ok_or_else(|| LocationParseError::InvalidField(s.to_owned()))?;

        Ok(Self {
            field,
            quadrant: quadrant_part.parse()?,
        })
    }
}

impl TryFrom<String> for FieldLocation {
    type Error = LocationParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldLocation> for String {
    fn from(loc: FieldLocation) -> Self {
        loc.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_form() {
        let loc: FieldLocation = "field1:red".parse().unwrap();
        assert_eq!(loc.field(), 1);
        assert_eq!(loc.quadrant(), Quadrant::Red);
        assert_eq!(loc.to_string(), "field1:red");
    }

    #[test]
    fn quadrant_is_case_insensitive() {
        let loc: FieldLocation = "field12:YELLOW".parse().unwrap();
        assert_eq!(loc.to_string(), "field12:yellow");
    }

    #[test]
    fn rejects_field_zero() {
        assert!(matches!(
            "field0:red".parse::<FieldLocation>(),
            Err(LocationParseError::InvalidField(_))
        ));
    }

    #[test]
    fn rejects_missing_separator_and_prefix() {
        assert!(matches!(
            "field1red".parse::<FieldLocation>(),
            Err(LocationParseError::Malformed(_))
        ));
        assert!(matches!(
            "f1:red".parse::<FieldLocation>(),
            Err(LocationParseError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_unknown_quadrant() {
        assert!(matches!(
            "field1:purple".parse::<FieldLocation>(),
            Err(LocationParseError::UnknownQuadrant(_))
        ));
    }

    #[test]
    fn all_on_enumerates_every_quadrant() {
        let all = FieldLocation::all_on(&[1, 2]);
        assert_eq!(all.len(), 8);
        assert_eq!(all[0].to_string(), "field1:red");
        assert_eq!(all[7].to_string(), "field2:yellow");
    }

    #[test]
    fn serde_uses_string_form() {
        let loc = FieldLocation::new(3, Quadrant::Green).unwrap();
        assert_eq!(serde_json::to_string(&loc).unwrap(), "\"field3:green\"");
        let back: FieldLocation = serde_json::from_str("\"field3:green\"").unwrap();
        assert_eq!(back, loc);
    }
}
