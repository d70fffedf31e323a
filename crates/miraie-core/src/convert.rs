// ── API-to-domain conversions ──
//
// Turns discovery records into device identities and seeds the initial
// status from the status endpoint's document.

use serde_json::{Map, Value};
use tracing::warn;

use miraie_api::{DeviceDetails, DeviceRecord, SpaceRecord};

use crate::model::{DeviceIdentity, DeviceStatus, DeviceTopics, HardwareInfo, slugify};

/// Whether a device's reported category matches the supported one.
pub(crate) fn is_supported(details: &DeviceDetails, category: &str) -> bool {
    details.category.eq_ignore_ascii_case(category)
}

/// Build an identity from the listing record and its details.
///
/// `None` if the backend gave the device no topic prefix.
pub(crate) fn device_identity(
    space: &SpaceRecord,
    record: &DeviceRecord,
    details: DeviceDetails,
) -> Option<DeviceIdentity> {
    let prefix = record.topic_prefix()?;
    Some(DeviceIdentity {
        id: record.device_id.clone(),
        name: record.device_name.clone(),
        slug: slugify(&record.device_name),
        area: space.space_name.clone(),
        topics: DeviceTopics::from_prefix(prefix),
        hardware: HardwareInfo {
            model_name: details.model_name,
            mac_address: details.mac_address,
            category: details.category,
            brand: details.brand,
            firmware_version: details.firmware_version,
            serial_number: details.serial_number,
            model_number: details.model_number,
            product_serial_number: details.product_serial_number,
        },
    })
}

/// Parse the status endpoint's document with the same rules as live merges.
pub(crate) fn initial_status(identity: &DeviceIdentity, document: &Map<String, Value>) -> DeviceStatus {
    let (status, outcome) = DeviceStatus::from_document(&identity.topics.status, document);
    for problem in &outcome.malformed {
        warn!(device_id = %identity.id, error = %problem, "ignoring malformed field in initial status");
    }
    status
}
