// ── Operational event stream ──
//
// Human-readable notifications for dashboards. Nothing on the control
// path depends on these being delivered.

mod hub;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use hub::{EventHub, Subscription};

/// Numeric discriminant carried in the `Type` field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Error = 1,
    LogLine = 2,
    ActionStart = 3,
    ActionComplete = 4,
    FileFetch = 5,
}

impl EventType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::LogLine => "log",
            Self::ActionStart => "action-start",
            Self::ActionComplete => "action-complete",
            Self::FileFetch => "file-fetch",
        }
    }

    pub fn from_code(code: u8) -> Result<Self, EventDecodeError> {
        match code {
            1 => Ok(Self::Error),
            2 => Ok(Self::LogLine),
            3 => Ok(Self::ActionStart),
            4 => Ok(Self::ActionComplete),
            5 => Ok(Self::FileFetch),
            other => Err(EventDecodeError::UnknownType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    #[error("unknown event type {0}")]
    UnknownType(u8),

    #[error("event type {kind:?} is missing field '{field}'")]
    MissingField { kind: EventType, field: &'static str },
}

/// One notification. Serializes as `{"Type": <n>, ...}` with PascalCase
/// payload fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Error { error: String },
    LogLine { message: String },
    ActionStart { action: String, message: String },
    ActionComplete { action: String },
    FileFetch { filename: String },
}

impl Event {
    pub fn kind(&self) -> EventType {
        match self {
            Self::Error { .. } => EventType::Error,
            Self::LogLine { .. } => EventType::LogLine,
            Self::ActionStart { .. } => EventType::ActionStart,
            Self::ActionComplete { .. } => EventType::ActionComplete,
            Self::FileFetch { .. } => EventType::FileFetch,
        }
    }

    /// One-line rendering for terminals and logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Error { error } => format!("error: {error}"),
            Self::LogLine { message } => message.clone(),
            Self::ActionStart { action, message } => format!("started {action}: {message}"),
            Self::ActionComplete { action } => format!("completed {action}"),
            Self::FileFetch { filename } => format!("fetched {filename}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    #[serde(rename = "Type")]
    kind: u8,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(rename = "Filename", default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        let mut wire = Self {
            kind: event.kind().code(),
            error: None,
            action: None,
            message: None,
            filename: None,
        };
        match event {
            Event::Error { error } => wire.error = Some(error),
            Event::LogLine { message } => wire.message = Some(message),
            Event::ActionStart { action, message } => {
                wire.action = Some(action);
                wire.message = Some(message);
            }
            Event::ActionComplete { action } => wire.action = Some(action),
            Event::FileFetch { filename } => wire.filename = Some(filename),
        }
        wire
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEvent::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireEvent::deserialize(deserializer)?;
        Self::from_wire(wire).map_err(serde::de::Error::custom)
    }
}

impl Event {
    fn from_wire(wire: WireEvent) -> Result<Self, EventDecodeError> {
        let kind = EventType::from_code(wire.kind)?;
        let need = |value: Option<String>, field| {
            value.ok_or(EventDecodeError::MissingField { kind, field })
        };
        Ok(match kind {
            EventType::Error => Self::Error {
                error: need(wire.error, "Error")?,
            },
            EventType::LogLine => Self::LogLine {
                message: need(wire.message, "Message")?,
            },
            EventType::ActionStart => Self::ActionStart {
                action: need(wire.action, "Action")?,
                message: wire.message.unwrap_or_default(),
            },
            EventType::ActionComplete => Self::ActionComplete {
                action: need(wire.action, "Action")?,
            },
            EventType::FileFetch => Self::FileFetch {
                filename: need(wire.filename, "Filename")?,
            },
        })
    }
}

/// Sink for operational events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);

    fn publish_error(&self, error: &dyn std::error::Error) {
        self.publish(Event::Error {
            error: error.to_string(),
        });
    }

    fn publish_log_line(&self, message: &str) {
        self.publish(Event::LogLine {
            message: message.to_owned(),
        });
    }

    fn publish_action_start(&self, action: &str, message: &str) {
        self.publish(Event::ActionStart {
            action: action.to_owned(),
            message: message.to_owned(),
        });
    }

    fn publish_action_complete(&self, action: &str) {
        self.publish(Event::ActionComplete {
            action: action.to_owned(),
        });
    }

    fn publish_file_fetch(&self, filename: &str) {
        self.publish(Event::FileFetch {
            filename: filename.to_owned(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_shapes() {
        let cases = [
            (
                Event::Error { error: "boom".into() },
                json!({"Type": 1, "Error": "boom"}),
            ),
            (
                Event::LogLine { message: "hello".into() },
                json!({"Type": 2, "Message": "hello"}),
            ),
            (
                Event::ActionStart {
                    action: "remap".into(),
                    message: "applying match 12".into(),
                },
                json!({"Type": 3, "Action": "remap", "Message": "applying match 12"}),
            ),
            (
                Event::ActionComplete { action: "remap".into() },
                json!({"Type": 4, "Action": "remap"}),
            ),
            (
                Event::FileFetch { filename: "fw.bin".into() },
                json!({"Type": 5, "Filename": "fw.bin"}),
            ),
        ];
        for (event, expected) in cases {
            assert_eq!(serde_json::to_value(&event).unwrap(), expected);
        }
    }

    #[test]
    fn decode_rejects_unknown_and_incomplete() {
        assert!(serde_json::from_value::<Event>(json!({"Type": 0})).is_err());
        assert!(serde_json::from_value::<Event>(json!({"Type": 9, "Message": "x"})).is_err());
        assert!(serde_json::from_value::<Event>(json!({"Type": 5})).is_err());
    }

    #[test]
    fn decode_known_event() {
        let event: Event = serde_json::from_str(r#"{"Type":2,"Message":"field 1 ready"}"#).unwrap();
        assert_eq!(
            event,
            Event::LogLine {
                message: "field 1 ready".into()
            }
        );
        assert_eq!(event.summary(), "field 1 ready");
    }
}
