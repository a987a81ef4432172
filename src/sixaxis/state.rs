use std::fmt;
use tracing::{debug, warn};

use crate::sixaxis::event::{EventClass, RawEventRecord};

/// Digital buttons of the pad. Codes per the kernel's button range for this
/// device; `from_code` is the single source of truth for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Select,
    L3,
    R3,
    Start,
    Ps,
    Up,
    Right,
    Down,
    Left,
    L2,
    R2,
    L1,
    R1,
    Triangle,
    Circle,
    Cross,
    Square,
}

impl Button {
    /// Maps a digital event code to a button. Codes outside the table are
    /// analog duplicates of the same physical buttons and map to nothing.
    pub fn from_code(code: u16) -> Option<Button> {
        match code {
            288 => Some(Button::Select),
            289 => Some(Button::L3),
            290 => Some(Button::R3),
            291 => Some(Button::Start),
            292 => Some(Button::Up),
            293 => Some(Button::Right),
            294 => Some(Button::Down),
            295 => Some(Button::Left),
            296 => Some(Button::L2),
            297 => Some(Button::R2),
            298 => Some(Button::L1),
            299 => Some(Button::R1),
            300 => Some(Button::Triangle),
            301 => Some(Button::Circle),
            302 => Some(Button::Cross),
            303 => Some(Button::Square),
            304 => Some(Button::Ps),
            _ => None,
        }
    }
}

/// Analog stick axes. Codes 0-3 on the stick event group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl StickAxis {
    pub fn from_code(code: u16) -> Option<StickAxis> {
        match code {
            0 => Some(StickAxis::LeftX),
            1 => Some(StickAxis::LeftY),
            2 => Some(StickAxis::RightX),
            3 => Some(StickAxis::RightY),
            _ => None,
        }
    }
}

/// Candidate gyro axes on the stick event group. The codes were observed but
/// never verified against hardware, so decoding them is gated off by default.
#[cfg(feature = "experimental-gyro")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrientationAxis {
    X,
    Y,
    Z,
}

#[cfg(feature = "experimental-gyro")]
impl OrientationAxis {
    pub fn from_code(code: u16) -> Option<OrientationAxis> {
        match code {
            5 => Some(OrientationAxis::X),
            6 => Some(OrientationAxis::Y),
            7 => Some(OrientationAxis::Z),
            _ => None,
        }
    }
}

/// One analog stick in raw device units, roughly [-128, 127] per axis,
/// `(0, 0)` at rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalogStick {
    pub x: i32,
    pub y: i32,
}

/// Raw orientation sample. Rest pose is `{-512, 512, 512}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub raw_x: i32,
    pub raw_y: i32,
    pub raw_z: i32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            raw_x: -512,
            raw_y: 512,
            raw_z: 512,
        }
    }
}

impl Orientation {
    /// Roll, normalized into [-1, +1]. The scale is inverted for this axis
    /// relative to the others; cause unknown.
    pub fn x(&self) -> f64 {
        clamp_unit((self.raw_x as f64 + 512.0) / 110.0)
    }

    /// Pitch. Returned raw and unconverted; the conversion for this axis was
    /// never established against hardware, so it is passed through as-is.
    pub fn y(&self) -> f64 {
        self.raw_y as f64
    }

    /// Third axis, normalized into [-1, +1]. Not the heading as far as
    /// anyone could tell.
    pub fn z(&self) -> f64 {
        clamp_unit((self.raw_z as f64 - 512.0) / 110.0)
    }

    #[cfg(feature = "experimental-gyro")]
    pub fn set_raw(&mut self, axis: OrientationAxis, value: i32) {
        match axis {
            OrientationAxis::X => self.raw_x = value,
            OrientationAxis::Y => self.raw_y = value,
            OrientationAxis::Z => self.raw_z = value,
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(-1.0, 1.0)
}

/// Live snapshot of the whole pad.
///
/// Buttons are tracked as level state ("currently held") rather than edges:
/// the actuation loop polls at its own cadence and needs hold status for
/// continuous throttle, not click events. Each applied record writes exactly
/// zero or one field, so a snapshot is never partially updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub select: bool,
    pub l3: bool,
    pub r3: bool,
    pub start: bool,
    pub ps: bool,
    pub up: bool,
    pub right: bool,
    pub down: bool,
    pub left: bool,
    pub l2: bool,
    pub r2: bool,
    pub l1: bool,
    pub r1: bool,
    pub triangle: bool,
    pub circle: bool,
    pub cross: bool,
    pub square: bool,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub orientation: Orientation,
}

impl ControllerState {
    fn button_field_mut(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Select => &mut self.select,
            Button::L3 => &mut self.l3,
            Button::R3 => &mut self.r3,
            Button::Start => &mut self.start,
            Button::Ps => &mut self.ps,
            Button::Up => &mut self.up,
            Button::Right => &mut self.right,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::L2 => &mut self.l2,
            Button::R2 => &mut self.r2,
            Button::L1 => &mut self.l1,
            Button::R1 => &mut self.r1,
            Button::Triangle => &mut self.triangle,
            Button::Circle => &mut self.circle,
            Button::Cross => &mut self.cross,
            Button::Square => &mut self.square,
        }
    }

    fn set_axis(&mut self, axis: StickAxis, value: i32) {
        match axis {
            StickAxis::LeftX => self.left_stick.x = value,
            StickAxis::LeftY => self.left_stick.y = value,
            StickAxis::RightX => self.right_stick.x = value,
            StickAxis::RightY => self.right_stick.y = value,
        }
    }

    /// Merges one record into the snapshot.
    ///
    /// Total over all inputs: unrecognized codes and classes degrade to a
    /// no-op, with a diagnostic where the input is genuinely unexpected.
    pub fn apply(&mut self, record: &RawEventRecord) {
        match record.event_class() {
            EventClass::Sync => {
                // Heartbeats carry no payload.
            }
            EventClass::Digital => {
                if let Some(button) = Button::from_code(record.code) {
                    *self.button_field_mut(button) = record.value == 1;
                }
                // Everything else in this group is an analog duplicate of a
                // button we already track; ignore it rather than double-count.
            }
            EventClass::Stick => match StickAxis::from_code(record.code) {
                Some(axis) => self.set_axis(axis, record.value),
                None => {
                    #[cfg(feature = "experimental-gyro")]
                    if let Some(axis) = OrientationAxis::from_code(record.code) {
                        self.orientation.set_raw(axis, record.value);
                        return;
                    }
                    warn!(event = %record, "unknown stick event");
                }
            },
            EventClass::AnalogAlias => {
                debug!(event = %record, "analog alias event ignored");
            }
            EventClass::Unknown(_) => {
                warn!(event = %record, "unknown group event");
            }
        }
    }
}

impl fmt::Display for ControllerState {
    /// Compact summary listing only the currently active fields, so polling
    /// logs stay short.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(24);

        if self.left_stick.x != 0 {
            parts.push(format!("LX={:+04}", self.left_stick.x));
        }
        if self.left_stick.y != 0 {
            parts.push(format!("LY={:+04}", self.left_stick.y));
        }
        if self.right_stick.x != 0 {
            parts.push(format!("RX={:+04}", self.right_stick.x));
        }
        if self.right_stick.y != 0 {
            parts.push(format!("RY={:+04}", self.right_stick.y));
        }

        if self.orientation.raw_x != 0 {
            parts.push(format!("OX={:+04}", self.orientation.raw_x));
        }
        if self.orientation.raw_y != 0 {
            parts.push(format!("OY={:+04}", self.orientation.raw_y));
        }
        if self.orientation.raw_z != 0 {
            parts.push(format!("OZ={:+04}", self.orientation.raw_z));
        }

        let held = [
            (self.up, "up"),
            (self.down, "down"),
            (self.left, "left"),
            (self.right, "right"),
            (self.l1, "L1"),
            (self.l2, "L2"),
            (self.r1, "R1"),
            (self.r2, "R2"),
            (self.triangle, "triangle"),
            (self.circle, "circle"),
            (self.cross, "cross"),
            (self.square, "square"),
            (self.select, "select"),
            (self.l3, "L3"),
            (self.r3, "R3"),
            (self.start, "start"),
            (self.ps, "PS"),
        ];
        for (active, name) in held {
            if active {
                parts.push(name.to_string());
            }
        }

        write!(f, "Sixaxis{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(class: u16, code: u16, value: i32) -> RawEventRecord {
        RawEventRecord {
            seconds: 0,
            microseconds: 0,
            class,
            code,
            value,
        }
    }

    #[test]
    fn button_table_covers_all_codes() {
        let expected = [
            (288, Button::Select),
            (289, Button::L3),
            (290, Button::R3),
            (291, Button::Start),
            (292, Button::Up),
            (293, Button::Right),
            (294, Button::Down),
            (295, Button::Left),
            (296, Button::L2),
            (297, Button::R2),
            (298, Button::L1),
            (299, Button::R1),
            (300, Button::Triangle),
            (301, Button::Circle),
            (302, Button::Cross),
            (303, Button::Square),
            (304, Button::Ps),
        ];
        for (code, button) in expected {
            assert_eq!(Button::from_code(code), Some(button), "code {code}");
        }
        assert_eq!(Button::from_code(287), None);
        assert_eq!(Button::from_code(305), None);
    }

    #[test]
    fn digital_record_sets_exactly_one_field() {
        let mut state = ControllerState::default();
        let mut expected = state.clone();

        state.apply(&record(1, 291, 1));
        expected.start = true;
        assert_eq!(state, expected);

        state.apply(&record(1, 291, 0));
        expected.start = false;
        assert_eq!(state, expected);
    }

    #[test]
    fn unknown_digital_code_is_a_silent_noop() {
        let mut state = ControllerState::default();
        state.cross = true;
        let before = state.clone();
        state.apply(&record(1, 305, 1));
        state.apply(&record(1, 320, 1));
        assert_eq!(state, before);
    }

    #[test]
    fn stick_record_sets_exactly_one_axis() {
        let mut state = ControllerState::default();
        let mut expected = state.clone();

        state.apply(&record(3, 1, -100));
        expected.left_stick.y = -100;
        assert_eq!(state, expected);

        state.apply(&record(3, 2, 64));
        expected.right_stick.x = 64;
        assert_eq!(state, expected);
    }

    #[test]
    fn apply_is_idempotent_for_identical_records() {
        let mut once = ControllerState::default();
        once.apply(&record(3, 0, 77));
        once.apply(&record(1, 302, 1));

        let mut twice = ControllerState::default();
        for _ in 0..2 {
            twice.apply(&record(3, 0, 77));
            twice.apply(&record(1, 302, 1));
        }
        assert_eq!(once, twice);
    }

    #[test]
    fn sync_alias_and_unknown_classes_leave_state_unchanged() {
        let mut state = ControllerState::default();
        state.apply(&record(3, 3, 42));
        let before = state.clone();

        state.apply(&record(0, 0, 0));
        state.apply(&record(4, 4, 589_838));
        state.apply(&record(99, 7, 1));
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_stick_code_leaves_state_unchanged() {
        let mut state = ControllerState::default();
        let before = state.clone();
        state.apply(&record(3, 42, 13));
        assert_eq!(state, before);
    }

    #[test]
    fn orientation_x_and_z_rescale_and_clamp() {
        let rest = Orientation::default();
        assert_eq!(rest.x(), 0.0);
        assert_eq!(rest.z(), 0.0);

        let tilted = Orientation {
            raw_x: -457,
            raw_y: 512,
            raw_z: 567,
        };
        assert!((tilted.x() - 0.5).abs() < 1e-9);
        assert!((tilted.z() - 0.5).abs() < 1e-9);

        // Monotonic within range, hard-clamped outside of it.
        let low = Orientation {
            raw_x: -2000,
            raw_y: 0,
            raw_z: -2000,
        };
        let high = Orientation {
            raw_x: 2000,
            raw_y: 0,
            raw_z: 2000,
        };
        assert_eq!(low.x(), -1.0);
        assert_eq!(low.z(), -1.0);
        assert_eq!(high.x(), 1.0);
        assert_eq!(high.z(), 1.0);
        assert!(rest.x() > low.x() && rest.x() < high.x());
    }

    #[test]
    fn orientation_y_is_raw_passthrough() {
        let o = Orientation {
            raw_x: 0,
            raw_y: 300,
            raw_z: 0,
        };
        assert_eq!(o.y(), 300.0);
    }

    #[test]
    fn summary_lists_only_active_fields() {
        let mut state = ControllerState::default();
        state.orientation = Orientation {
            raw_x: 0,
            raw_y: 0,
            raw_z: 0,
        };
        assert_eq!(state.to_string(), "Sixaxis{}");

        state.left_stick.y = -100;
        state.start = true;
        let summary = state.to_string();
        assert!(summary.contains("LY=-100"));
        assert!(summary.contains("start"));
        assert!(!summary.contains("RX"));
        assert!(!summary.contains("cross"));
    }
}
