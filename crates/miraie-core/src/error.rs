// ── Core error types ──
//
// User-facing errors from miraie-core. Consumers never see HTTP status
// codes or MQTT client errors directly; the `From<miraie_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication errors ────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Login identifier is not registered: {message}")]
    RegistrationRequired { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Transport disconnected: {reason}")]
    TransportDisconnected { reason: String },

    #[error("Not connected to the broker")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed message on {topic}: {reason}")]
    MalformedMessage { topic: String, reason: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("No home is registered to this account")]
    HomeNotFound,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for failures that a fresh login cannot fix.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::RegistrationRequired { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<miraie_api::Error> for CoreError {
    fn from(err: miraie_api::Error) -> Self {
        match err {
            miraie_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            miraie_api::Error::RegistrationRequired { message } => {
                CoreError::RegistrationRequired { message }
            }
            miraie_api::Error::Api { status, message } => CoreError::ConnectionFailed {
                reason: format!("HTTP {status}: {message}"),
            },
            miraie_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            miraie_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            miraie_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            miraie_api::Error::Deserialization { message, .. } => CoreError::ConnectionFailed {
                reason: format!("unexpected response: {message}"),
            },
            miraie_api::Error::Mqtt(msg) => CoreError::ConnectionFailed {
                reason: format!("MQTT error: {msg}"),
            },
            miraie_api::Error::NotConnected => CoreError::NotConnected,
        }
    }
}
