// ── Broker frames ──
//
// Payloads published to robots. Field names are part of the firmware
// wire contract and use the PascalCase names the robots decode.

use serde::{Deserialize, Serialize};

use super::FieldLocation;

/// Raw gamepad state for one driver position (axes scaled to 0–255).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    #[serde(rename = "AxisLX")]
    pub axis_lx: u8,
    #[serde(rename = "AxisLY")]
    pub axis_ly: u8,
    #[serde(rename = "AxisRX")]
    pub axis_rx: u8,
    #[serde(rename = "AxisRY")]
    pub axis_ry: u8,
    #[serde(rename = "AxisLT")]
    pub axis_lt: u8,
    #[serde(rename = "AxisRT")]
    pub axis_rt: u8,
    #[serde(rename = "AxisDX")]
    pub axis_dx: u8,
    #[serde(rename = "AxisDY")]
    pub axis_dy: u8,

    #[serde(rename = "ButtonBack")]
    pub button_back: bool,
    #[serde(rename = "ButtonStart")]
    pub button_start: bool,
    #[serde(rename = "ButtonLogo")]
    pub button_logo: bool,
    #[serde(rename = "ButtonLeftStick")]
    pub button_left_stick: bool,
    #[serde(rename = "ButtonRightStick")]
    pub button_right_stick: bool,
    #[serde(rename = "ButtonX")]
    pub button_x: bool,
    #[serde(rename = "ButtonY")]
    pub button_y: bool,
    #[serde(rename = "ButtonA")]
    pub button_a: bool,
    #[serde(rename = "ButtonB")]
    pub button_b: bool,
    #[serde(rename = "ButtonLShoulder")]
    pub button_l_shoulder: bool,
    #[serde(rename = "ButtonRShoulder")]
    pub button_r_shoulder: bool,
}

impl ControlFrame {
    /// Sticks and triggers centered, nothing pressed.
    pub fn neutral() -> Self {
        Self {
            axis_lx: 127,
            axis_ly: 127,
            axis_rx: 127,
            axis_ry: 127,
            axis_lt: 127,
            axis_rt: 127,
            axis_dx: 127,
            axis_dy: 127,
            ..Self::default()
        }
    }
}

/// Where a robot is supposed to be, so firmware can fail safe on mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFrame {
    #[serde(rename = "Field")]
    pub field: u32,
    #[serde(rename = "Quadrant")]
    pub quadrant: String,
}

impl From<FieldLocation> for LocationFrame {
    fn from(loc: FieldLocation) -> Self {
        Self {
            field: loc.field(),
            quadrant: loc.quadrant().as_str().to_ascii_uppercase(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn location_frame_uses_upper_case_quadrant() {
        let frame = LocationFrame::from("field2:blue".parse::<FieldLocation>().unwrap());
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"Field":2,"Quadrant":"BLUE"}"#
        );
    }

    #[test]
    fn control_frame_field_names_match_firmware() {
        let json = serde_json::to_value(ControlFrame::neutral()).unwrap();
        assert_eq!(json["AxisLX"], 127);
        assert_eq!(json["ButtonRShoulder"], false);
    }
}
