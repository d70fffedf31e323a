// ── Device status and the partial-update merge ──
//
// Inbound status documents are partial. Every recognized key overwrites
// its field; every absent key leaves its field alone. Temperatures that
// are present but unparseable collapse to the -1.0 sentinel, while a bad
// enum value keeps the previous value and is reported as malformed.

use std::str::FromStr;

use serde_json::{Map, Value};

use super::enums::{DisplayMode, FanMode, HvacMode, PowerMode, PresetMode, SwingMode};
use crate::error::CoreError;
use crate::wire;

/// Sentinel for a temperature that is unknown or could not be parsed.
pub const UNKNOWN_TEMPERATURE: f64 = -1.0;

/// Which topic a status document arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// The full status topic: every field may be present.
    Status,
    /// The connection-status topic: only the online flag is honoured.
    ConnectionStatus,
}

/// Point-in-time status of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub is_online: bool,
    /// Target temperature in °C, or [`UNKNOWN_TEMPERATURE`].
    pub temperature: f64,
    /// Measured room temperature in °C, or [`UNKNOWN_TEMPERATURE`].
    pub room_temperature: f64,
    pub power: PowerMode,
    pub hvac_mode: HvacMode,
    pub fan_mode: FanMode,
    pub display: DisplayMode,
    pub preset: PresetMode,
    pub vertical_swing: SwingMode,
    pub horizontal_swing: SwingMode,
    // The two flags arrive independently; `preset` is derived from both.
    eco: bool,
    boost: bool,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            is_online: false,
            temperature: UNKNOWN_TEMPERATURE,
            room_temperature: UNKNOWN_TEMPERATURE,
            power: PowerMode::default(),
            hvac_mode: HvacMode::default(),
            fan_mode: FanMode::default(),
            display: DisplayMode::default(),
            preset: PresetMode::default(),
            vertical_swing: SwingMode::default(),
            horizontal_swing: SwingMode::default(),
            eco: false,
            boost: false,
        }
    }
}

/// Result of merging one document into a [`DeviceStatus`].
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Number of keys that were applied.
    pub recognized: usize,
    /// Keys that were present but could not be interpreted.
    pub malformed: Vec<CoreError>,
}

impl MergeOutcome {
    /// Whether anything was applied.
    pub fn applied(&self) -> bool {
        self.recognized > 0
    }
}

impl DeviceStatus {
    /// Build a status from a full status document, starting from defaults.
    pub fn from_document(topic: &str, document: &Map<String, Value>) -> (Self, MergeOutcome) {
        let mut status = Self::default();
        let outcome = status.merge(StatusSource::Status, topic, document);
        (status, outcome)
    }

    /// Apply a partial document in place.
    pub fn merge(
        &mut self,
        source: StatusSource,
        topic: &str,
        document: &Map<String, Value>,
    ) -> MergeOutcome {
        let mut merger = Merger {
            topic,
            document,
            outcome: MergeOutcome::default(),
        };

        if let Some(online) = merger.flag(wire::ONLINE, "true", "false") {
            self.is_online = online;
        }

        if source == StatusSource::ConnectionStatus {
            return merger.outcome;
        }

        merger.temperature(wire::TARGET_TEMPERATURE, &mut self.temperature);
        merger.temperature(wire::ROOM_TEMPERATURE, &mut self.room_temperature);
        merger.enumerated(wire::POWER, &mut self.power);
        merger.enumerated(wire::HVAC_MODE, &mut self.hvac_mode);
        merger.enumerated(wire::FAN_MODE, &mut self.fan_mode);
        merger.enumerated(wire::DISPLAY, &mut self.display);
        merger.swing(wire::VERTICAL_SWING, &mut self.vertical_swing);
        merger.swing(wire::HORIZONTAL_SWING, &mut self.horizontal_swing);

        let eco = merger.flag(wire::ECO, wire::ON, wire::OFF);
        let boost = merger.flag(wire::BOOST, wire::ON, wire::OFF);
        if eco.is_some() || boost.is_some() {
            self.eco = eco.unwrap_or(self.eco);
            self.boost = boost.unwrap_or(self.boost);
            self.preset = PresetMode::from_flags(self.eco, self.boost);
        }

        merger.outcome
    }
}

/// Parse a temperature value. Absent, null or unparseable input yields
/// [`UNKNOWN_TEMPERATURE`].
pub fn parse_temperature(value: Option<&Value>) -> f64 {
    value
        .and_then(temperature_value)
        .unwrap_or(UNKNOWN_TEMPERATURE)
}

fn temperature_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

// ── Merger ───────────────────────────────────────────────────────────

struct Merger<'a> {
    topic: &'a str,
    document: &'a Map<String, Value>,
    outcome: MergeOutcome,
}

impl Merger<'_> {
    fn malformed(&mut self, key: &str, value: &Value) {
        self.outcome.malformed.push(CoreError::MalformedMessage {
            topic: self.topic.to_owned(),
            reason: format!("unrecognized value {value} for `{key}`"),
        });
    }

    fn temperature(&mut self, key: &str, slot: &mut f64) {
        let Some(value) = self.document.get(key) else {
            return;
        };
        let parsed = temperature_value(value);
        if parsed.is_none() && !value.is_null() {
            self.malformed(key, value);
        }
        *slot = parsed.unwrap_or(UNKNOWN_TEMPERATURE);
        self.outcome.recognized += 1;
    }

    fn enumerated<T: FromStr>(&mut self, key: &str, slot: &mut T) {
        let Some(value) = self.document.get(key) else {
            return;
        };
        match value.as_str().and_then(|s| s.parse::<T>().ok()) {
            Some(parsed) => {
                *slot = parsed;
                self.outcome.recognized += 1;
            }
            None => self.malformed(key, value),
        }
    }

    fn swing(&mut self, key: &str, slot: &mut SwingMode) {
        let Some(value) = self.document.get(key) else {
            return;
        };
        let position = value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()));
        match position.and_then(SwingMode::from_position) {
            Some(mode) => {
                *slot = mode;
                self.outcome.recognized += 1;
            }
            None => self.malformed(key, value),
        }
    }

    fn flag(&mut self, key: &str, on: &str, off: &str) -> Option<bool> {
        let value = self.document.get(key)?;
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == on => Some(true),
            Value::String(s) if s == off => Some(false),
            _ => None,
        };
        match parsed {
            Some(_) => self.outcome.recognized += 1,
            None => self.malformed(key, value),
        }
        parsed
    }
}
