// ── Runtime connection configuration ──
//
// Describes *how* to reach the MirAIe cloud: who to log in as, which
// endpoints and broker to use, and what the devices can do. Carries
// credential data but never touches disk; callers build one and hand it
// to `Controller`.

use std::time::Duration;

use secrecy::SecretString;

use miraie_api::{AuthType, Endpoints, MqttConfig, TlsMode, TransportConfig};

use crate::model::SwingAxes;

/// Device category retained at discovery unless configured otherwise.
pub const DEFAULT_CATEGORY: &str = "ac";

/// Configuration for one account.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Which identifier kind `identifier` is.
    pub auth_type: AuthType,
    /// Mobile number, email address or username.
    pub identifier: String,
    pub secret: SecretString,
    /// Identity and discovery endpoints.
    pub endpoints: Endpoints,
    /// TLS verification for the HTTP endpoints.
    pub tls: TlsMode,
    /// HTTP request timeout.
    pub timeout: Duration,
    pub mqtt: MqttConfig,
    /// Swing capability of the supported device category.
    pub swing_axes: SwingAxes,
    /// Category retained at discovery (compared case-insensitively).
    pub category: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            auth_type: AuthType::default(),
            identifier: String::new(),
            secret: SecretString::from(String::new()),
            endpoints: Endpoints::default(),
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
            mqtt: MqttConfig::default(),
            swing_axes: SwingAxes::default(),
            category: DEFAULT_CATEGORY.into(),
        }
    }
}

impl ControllerConfig {
    /// HTTP transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}
