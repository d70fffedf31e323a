// ── Home ──
//
// The device collection built at discovery. Fixed for the lifetime of a
// connection; adding or removing a unit requires a new discovery.

use std::collections::BTreeMap;

use crate::device::Device;

/// A user's home and the supported devices found in it.
#[derive(Debug, Clone)]
pub struct Home {
    id: String,
    devices: BTreeMap<String, Device>,
}

impl Home {
    pub fn new(id: impl Into<String>, devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            id: id.into(),
            devices: devices
                .into_iter()
                .map(|device| (device.id().to_owned(), device))
                .collect(),
        }
    }

    /// The home identifier, also the MQTT username.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Look up a device by id.
    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    /// All devices, ordered by id.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
