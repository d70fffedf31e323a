use rand::Rng;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Which identifier the user logs in with.
///
/// The identity endpoint expects the identifier under a key named after
/// the auth type (`"mobile"`, `"email"` or `"username"`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthType {
    #[default]
    Mobile,
    Email,
    Username,
}

impl AuthType {
    /// The JSON key carrying the login identifier.
    pub fn identifier_key(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Email => "email",
            Self::Username => "username",
        }
    }
}

/// Credentials issued by a successful login.
///
/// Replaced wholesale on every re-login; never partially mutated.
/// Token material is wrapped in [`SecretString`] so it never shows up
/// in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bearer token for HTTP calls, also the MQTT password.
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub user_id: String,
    /// Lifetime hint in seconds, as reported by the backend.
    pub expires_in: u64,
}

/// Authentication material handed to the MQTT transport on connect.
#[derive(Debug, Clone)]
pub struct TransportAuth {
    /// The home identifier.
    pub username: String,
    /// The current access token.
    pub password: SecretString,
}

/// Generate the random per-login scope string (`"an"` + up to 9 digits).
///
/// The backend uses it to tell concurrent sessions of one user apart.
pub fn generate_scope() -> String {
    let n: u64 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("an{n}")
}

/// Generate a fresh MQTT client identifier.
///
/// A new one is used for every connect so a previous session with the
/// same identity is never kicked off the broker by a collision.
pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    let long: u64 = rng.gen_range(0..10_000_000_000_000_000);
    let short: u32 = rng.gen_range(0..100_000);
    format!("an{long}{short}")
}
