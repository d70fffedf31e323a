//! Configuration for MirAIe clients.
//!
//! A TOML file merged with `MIRAIE_`-prefixed environment variables,
//! secret resolution (named env var or plaintext), and translation to
//! `miraie_core::ControllerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use miraie_core::{
    AuthType, ControllerConfig, Endpoints, MqttConfig, SwingAxes, TlsMode,
    config::DEFAULT_CATEGORY,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no secret configured; set `account.secret` or `account.secret_env`")]
    NoCredentials,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub account: Account,

    #[serde(default)]
    pub endpoints: EndpointSettings,

    #[serde(default)]
    pub mqtt: MqttSettings,

    #[serde(default)]
    pub devices: DeviceSettings,
}

/// Who to log in as.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Account {
    /// "mobile", "email" or "username".
    #[serde(default)]
    pub auth_type: AuthType,

    /// The login identifier itself.
    #[serde(default)]
    pub identifier: String,

    /// Plaintext secret (prefer `secret_env`).
    pub secret: Option<String>,

    /// Name of an environment variable holding the secret.
    pub secret_env: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EndpointSettings {
    #[serde(default = "default_auth_base")]
    pub auth_base: String,

    #[serde(default = "default_app_base")]
    pub app_base: String,

    /// Extra CA certificate to trust for the HTTP endpoints.
    pub ca_cert: Option<PathBuf>,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            auth_base: default_auth_base(),
            app_base: default_app_base(),
            ca_cert: None,
            timeout: default_timeout(),
        }
    }
}

fn default_auth_base() -> String {
    "https://auth.miraie.in".into()
}
fn default_app_base() -> String {
    "https://app.miraie.in".into()
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MqttSettings {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub tls: bool,

    /// Keep-alive in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,

    #[serde(default)]
    pub clean_session: bool,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            tls: true,
            keep_alive: default_keep_alive(),
            clean_session: false,
        }
    }
}

fn default_mqtt_host() -> String {
    "mqtt.miraie.in".into()
}
fn default_mqtt_port() -> u16 {
    8883
}
fn default_true() -> bool {
    true
}
fn default_keep_alive() -> u64 {
    60
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Category retained at discovery.
    #[serde(default = "default_category")]
    pub category: String,

    /// "single" or "dual".
    #[serde(default)]
    pub swing_axes: SwingAxes,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            category: default_category(),
            swing_axes: SwingAxes::default(),
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("in", "miraie", "miraie").map_or_else(
        || PathBuf::from(".miraie").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; defaults and environment still apply.
///
/// Nested keys use a double underscore: `MIRAIE_ACCOUNT__IDENTIFIER`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MIRAIE_").split("__"));

    Ok(figment.extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve the login secret: the named env var first, then plaintext.
pub fn resolve_secret(account: &Account) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = account.secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(ref secret) = account.secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials)
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

/// Validate a loaded config and build a `ControllerConfig` from it.
pub fn to_controller_config(cfg: &Config) -> Result<ControllerConfig, ConfigError> {
    if cfg.account.identifier.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "account.identifier".into(),
            reason: "must not be empty".into(),
        });
    }
    let secret = resolve_secret(&cfg.account)?;

    let auth_base = parse_url("endpoints.auth_base", &cfg.endpoints.auth_base)?;
    let app_base = parse_url("endpoints.app_base", &cfg.endpoints.app_base)?;
    let endpoints =
        Endpoints::new(&auth_base, &app_base).map_err(|e| ConfigError::Validation {
            field: "endpoints".into(),
            reason: e.to_string(),
        })?;

    if cfg.mqtt.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "mqtt.host".into(),
            reason: "must not be empty".into(),
        });
    }
    if cfg.mqtt.keep_alive == 0 {
        return Err(ConfigError::Validation {
            field: "mqtt.keep_alive".into(),
            reason: "must be at least one second".into(),
        });
    }
    if cfg.devices.category.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "devices.category".into(),
            reason: "must not be empty".into(),
        });
    }

    let tls = cfg
        .endpoints
        .ca_cert
        .clone()
        .map_or(TlsMode::System, TlsMode::CustomCa);

    Ok(ControllerConfig {
        auth_type: cfg.account.auth_type,
        identifier: cfg.account.identifier.clone(),
        secret,
        endpoints,
        tls,
        timeout: Duration::from_secs(cfg.endpoints.timeout),
        mqtt: MqttConfig {
            host: cfg.mqtt.host.clone(),
            port: cfg.mqtt.port,
            use_tls: cfg.mqtt.tls,
            keep_alive: Duration::from_secs(cfg.mqtt.keep_alive),
            clean_session: cfg.mqtt.clean_session,
        },
        swing_axes: cfg.devices.swing_axes,
        category: cfg.devices.category.clone(),
    })
}
