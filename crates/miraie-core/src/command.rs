// ── Command API ──
//
// Every control operation is a `Command` variant. A command renders to a
// flat JSON document: the fixed envelope plus the keys for exactly one
// attribute.

use bytes::Bytes;
use serde_json::{Map, Value, json};

use crate::error::CoreError;
use crate::model::{FanMode, HvacMode, PowerMode, PresetMode, SwingMode};
use crate::wire;

/// Lowest target temperature the units accept, in °C.
pub const MIN_TEMPERATURE: f64 = 16.0;
/// Highest target temperature the units accept, in °C.
pub const MAX_TEMPERATURE: f64 = 30.0;

/// A single control intent for one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetPower(PowerMode),
    SetTemperature(f64),
    SetHvacMode(HvacMode),
    SetFanMode(FanMode),
    SetPreset(PresetMode),
    /// Move one or both louvre axes. At least one side is `Some`.
    SetSwing {
        vertical: Option<SwingMode>,
        horizontal: Option<SwingMode>,
    },
}

impl Command {
    /// Check the command's arguments before it goes on the wire.
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            Self::SetTemperature(t) if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) => {
                Err(CoreError::ValidationFailed {
                    message: format!(
                        "temperature {t} outside {MIN_TEMPERATURE}..={MAX_TEMPERATURE}"
                    ),
                })
            }
            Self::SetSwing {
                vertical: None,
                horizontal: None,
            } => Err(CoreError::ValidationFailed {
                message: "swing command names no axis".into(),
            }),
            _ => Ok(()),
        }
    }

    /// Render the control document.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = wire::envelope();
        match *self {
            Self::SetPower(mode) => {
                doc.insert(wire::POWER.into(), json!(mode.as_ref()));
            }
            Self::SetTemperature(t) => {
                doc.insert(wire::TARGET_TEMPERATURE.into(), json!(decimal(t)));
            }
            Self::SetHvacMode(mode) => {
                doc.insert(wire::HVAC_MODE.into(), json!(mode.as_ref()));
            }
            Self::SetFanMode(mode) => {
                doc.insert(wire::FAN_MODE.into(), json!(mode.as_ref()));
            }
            Self::SetPreset(preset) => {
                let (eco, boost) = preset.flags();
                doc.insert(wire::ECO.into(), json!(on_off(eco)));
                doc.insert(wire::BOOST.into(), json!(on_off(boost)));
            }
            Self::SetSwing {
                vertical,
                horizontal,
            } => {
                if let Some(mode) = vertical {
                    doc.insert(wire::VERTICAL_SWING.into(), json!(mode.position()));
                }
                if let Some(mode) = horizontal {
                    doc.insert(wire::HORIZONTAL_SWING.into(), json!(mode.position()));
                }
            }
        }
        doc
    }

    /// Validate and serialize for publishing.
    pub fn encode(&self) -> Result<Bytes, CoreError> {
        self.validate()?;
        serde_json::to_vec(&self.to_document())
            .map(Bytes::from)
            .map_err(|e| CoreError::Internal(format!("failed to encode command: {e}")))
    }
}

/// Shortest decimal form, always with a fractional part: 24 -> "24.0".
fn decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { wire::ON } else { wire::OFF }
}
