use serde::{Deserialize, Serialize};

/// Default number of samples kept in a switch or valuator history ring.
pub const DEFAULT_HISTORY_LEN: usize = 50;

/// Maximum arity of an N-sensor.
pub const MAX_NSENSOR_VALUES: usize = 100;

/// Maximum length of a UI description string, in characters.
pub const INPUT_UIDESC_LEN: usize = 1024;

/// Degrees of freedom reported by a 6-sensor (translation, rotation, scale).
pub const SENSOR6_DOF: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputType {
    Switch2,
    SwitchN,
    Valuator,
    Keystroke,
    Text,
    Sensor6,
    SensorN,
    Position,
    Plane,
    Control,
}

impl InputType {
    /// Types that can be stored in an input map.
    pub const MAPPED: [InputType; 6] = [
        InputType::Switch2,
        InputType::SwitchN,
        InputType::Valuator,
        InputType::Sensor6,
        InputType::SensorN,
        InputType::Control,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InputType::Switch2 => "2-switch",
            InputType::SwitchN => "N-switch",
            InputType::Valuator => "valuator",
            InputType::Keystroke => "keystroke",
            InputType::Text => "text",
            InputType::Sensor6 => "6-sensor",
            InputType::SensorN => "N-sensor",
            InputType::Position => "position",
            InputType::Plane => "plane",
            InputType::Control => "control",
        }
    }

    /// Name used when describing a synthesized placeholder, e.g. `switch2(dummy[3])`.
    pub fn dummy_desc_name(self) -> &'static str {
        match self {
            InputType::Switch2 => "switch2",
            InputType::SwitchN => "switchN",
            InputType::Valuator => "valuator",
            InputType::Sensor6 => "sensor6",
            InputType::SensorN => "sensorN",
            other => other.name(),
        }
    }

    pub fn is_mappable(self) -> bool {
        Self::MAPPED.contains(&self)
    }

    /// Whether a missing slot of this type may be filled with a dummy.
    pub fn has_dummy(self) -> bool {
        self.is_mappable() && self != InputType::Control
    }

    /// Position of this type in [`InputType::MAPPED`].
    pub fn map_slot(self) -> Option<usize> {
        Self::MAPPED.iter().position(|t| *t == self)
    }

    /// Section heading used when listing UI descriptions.
    pub fn ui_heading(self) -> &'static str {
        match self {
            InputType::Switch2 => "Buttons:",
            InputType::SwitchN => "N-way switches:",
            InputType::Valuator => "Valuators:",
            InputType::Sensor6 => "6DOF sensors:",
            InputType::SensorN => "N-sensors:",
            InputType::Control => "Controls:",
            other => other.name(),
        }
    }

    /// Element label used in UI listings, e.g. `button[2]`.
    pub fn ui_label(self) -> &'static str {
        match self {
            InputType::Switch2 => "button",
            InputType::SwitchN => "switch",
            InputType::Valuator => "valuator",
            InputType::Sensor6 => "6-sensor",
            InputType::SensorN => "N-sensor",
            InputType::Control => "control",
            other => other.name(),
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of offering a declared input to a device recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMatch {
    /// Not this recognizer; keep looking.
    NoMatch,
    /// The recognizer owns the declaration but cannot service it.
    MatchUnable,
    MatchAble,
}

impl InputMatch {
    pub fn is_mapped(self) -> bool {
        !matches!(self, InputMatch::NoMatch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintStyle {
    #[default]
    Brief,
    OneLine,
    Verbose,
}
