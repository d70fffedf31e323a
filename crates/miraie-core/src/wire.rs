// ── MQTT wire contract ──
//
// Topic suffixes, payload keys and the fixed envelope shared by every
// outbound control message.

use serde_json::{Map, Value, json};

// ── Topics ───────────────────────────────────────────────────────────

pub const CONTROL_SUFFIX: &str = "control";
pub const STATUS_SUFFIX: &str = "status";
pub const CONNECTION_STATUS_SUFFIX: &str = "connectionStatus";

// ── Payload keys ─────────────────────────────────────────────────────

pub const POWER: &str = "ps";
pub const TARGET_TEMPERATURE: &str = "actmp";
pub const ROOM_TEMPERATURE: &str = "rmtmp";
pub const HVAC_MODE: &str = "acmd";
pub const FAN_MODE: &str = "acfs";
pub const DISPLAY: &str = "acdc";
pub const ECO: &str = "acem";
pub const BOOST: &str = "acpm";
pub const VERTICAL_SWING: &str = "acvs";
pub const HORIZONTAL_SWING: &str = "achs";
pub const ONLINE: &str = "onlineStatus";

/// Flag values used by the eco/boost/online keys.
pub const ON: &str = "on";
pub const OFF: &str = "off";

// ── Envelope ─────────────────────────────────────────────────────────

/// The three fixed keys present on every control message.
pub fn envelope() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("ki".into(), json!(1));
    map.insert("cnt".into(), json!("an"));
    map.insert("sid".into(), json!("1"));
    map
}

/// Join a device topic prefix and a suffix.
pub fn topic(prefix: &str, suffix: &str) -> String {
    format!("{}/{suffix}", prefix.trim_end_matches('/'))
}
