// ── Device domain model ──
//
// Identity (immutable, from discovery), status (mutable, merged from
// MQTT documents) and the enumerated attributes shared by both.

pub mod enums;
pub mod identity;
pub mod status;

pub use enums::{
    DisplayMode, FanMode, HvacMode, PowerMode, PresetMode, SwingAxes, SwingAxis, SwingMode,
};
pub use identity::{DeviceIdentity, DeviceTopics, HardwareInfo, slugify};
pub use status::{
    DeviceStatus, MergeOutcome, StatusSource, UNKNOWN_TEMPERATURE, parse_temperature,
};
