use thiserror::Error;

/// Top-level error type for the `miraie-api` crate.
///
/// Covers every failure mode across the API surfaces: identity login,
/// device discovery over HTTP, and the MQTT transport.
/// `miraie-core` maps these into domain-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The identity endpoint rejected the credentials (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login identifier is not provisioned with the backend (HTTP 412).
    #[error("Identifier is not registered: {message}")]
    RegistrationRequired { message: String },

    // ── HTTP ────────────────────────────────────────────────────────
    /// Any other non-success HTTP response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── MQTT ────────────────────────────────────────────────────────
    /// The MQTT client rejected a request (queue closed, bad topic).
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// A publish or subscribe was attempted with no live connection.
    #[error("MQTT transport is not connected")]
    NotConnected,
}

impl From<rumqttc::ClientError> for Error {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Mqtt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_shows_status() {
        let err = Error::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 503): unavailable");
    }
}
