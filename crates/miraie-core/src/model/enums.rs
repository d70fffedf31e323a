// ── Enumerated device attributes ──
//
// Every attribute the air conditioner reports or accepts as a command.
// String-valued attributes round-trip through strum using their wire
// spelling; swing positions are carried as integers.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, FromRepr};

/// Power state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PowerMode {
    On,
    #[default]
    Off,
}

/// Operating mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HvacMode {
    #[default]
    Cool,
    Auto,
    Dry,
    Fan,
}

/// Fan speed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FanMode {
    #[default]
    Auto,
    Quiet,
    Low,
    Medium,
    High,
}

/// Front-panel display state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    On,
    Off,
}

/// Preset, derived from the independent eco and boost flags.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresetMode {
    #[default]
    None,
    Eco,
    Boost,
}

impl PresetMode {
    /// Boost wins over eco, eco wins over none.
    pub fn from_flags(eco: bool, boost: bool) -> Self {
        if boost {
            Self::Boost
        } else if eco {
            Self::Eco
        } else {
            Self::None
        }
    }

    /// The `(eco, boost)` flag pair that selects this preset.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::None => (false, false),
            Self::Eco => (true, false),
            Self::Boost => (false, true),
        }
    }
}

/// Louvre position. `Auto` sweeps; the numbered positions are fixed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
    FromRepr,
)]
#[repr(u8)]
pub enum SwingMode {
    #[default]
    Auto = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl SwingMode {
    /// Integer carried on the wire.
    pub fn position(self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
        }
    }

    /// Parse a wire integer; `None` for anything outside `0..=5`.
    pub fn from_position(value: i64) -> Option<Self> {
        u8::try_from(value).ok().and_then(Self::from_repr)
    }
}

/// One louvre axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SwingAxis {
    Vertical,
    Horizontal,
}

/// Which swing axes a device category can drive.
///
/// Older units expose a single combined louvre (reported and commanded
/// through the vertical key); newer ones move both axes independently.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SwingAxes {
    Single,
    #[default]
    Dual,
}

impl SwingAxes {
    pub fn supports(self, axis: SwingAxis) -> bool {
        match self {
            Self::Single => axis == SwingAxis::Vertical,
            Self::Dual => true,
        }
    }
}
