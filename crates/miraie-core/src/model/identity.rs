// ── Device identity ──
//
// Immutable facts about a device, fixed at discovery time.

use serde::{Deserialize, Serialize};

use crate::wire;

/// The three MQTT topics a device uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceTopics {
    /// Outbound commands.
    pub control: String,
    /// Inbound partial status documents.
    pub status: String,
    /// Inbound online/offline notifications.
    pub connection_status: String,
}

impl DeviceTopics {
    /// Derive all three topics from the device's topic prefix.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            control: wire::topic(prefix, wire::CONTROL_SUFFIX),
            status: wire::topic(prefix, wire::STATUS_SUFFIX),
            connection_status: wire::topic(prefix, wire::CONNECTION_STATUS_SUFFIX),
        }
    }

    /// The topics the session subscribes to for this device.
    pub fn subscriptions(&self) -> [&str; 2] {
        [&self.status, &self.connection_status]
    }
}

/// Hardware metadata reported by the device-details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub model_name: String,
    pub mac_address: String,
    pub category: String,
    pub brand: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub model_number: String,
    pub product_serial_number: String,
}

/// Who a device is and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub id: String,
    /// Display name as entered in the mobile app.
    pub name: String,
    /// Lowercased, hyphenated form of `name`.
    pub slug: String,
    /// Room or area the device was placed in.
    pub area: String,
    pub topics: DeviceTopics,
    pub hardware: HardwareInfo,
}

/// Normalize a display name: lowercase, spaces become hyphens.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
