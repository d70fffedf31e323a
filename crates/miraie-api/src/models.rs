// Raw response types for the discovery endpoints.
//
// Field names follow the backend's camelCase JSON. Everything that isn't
// needed to build a device is left out; missing strings default to empty.

use serde::{Deserialize, Serialize};

/// One home as returned by the homes endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeRecord {
    pub home_id: String,
    #[serde(default)]
    pub spaces: Vec<SpaceRecord>,
}

/// A space (room/area) inside a home.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceRecord {
    #[serde(default)]
    pub space_name: String,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// A device reference listed under a space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    /// Topic prefixes; the first one is the device's MQTT prefix.
    #[serde(default)]
    pub topic: Vec<String>,
}

impl DeviceRecord {
    /// The device's MQTT topic prefix, if the backend supplied one.
    pub fn topic_prefix(&self) -> Option<&str> {
        self.topic.first().map(String::as_str)
    }
}

/// Hardware metadata from the device-details endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceDetails {
    pub category: String,
    pub model_name: String,
    pub mac_address: String,
    pub brand: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub model_number: String,
    pub product_serial_number: String,
}
