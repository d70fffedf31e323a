// miraie-api: Async Rust client for the MirAIe cloud (identity, discovery, MQTT)

pub mod auth;
pub mod client;
pub mod discovery;
pub mod error;
pub mod login;
pub mod models;
pub mod mqtt;
pub mod transport;

pub use auth::{AuthType, Credentials, TransportAuth, generate_client_id, generate_scope};
pub use client::{ApiClient, Endpoints};
pub use error::Error;
pub use models::{DeviceDetails, DeviceRecord, HomeRecord, SpaceRecord};
pub use mqtt::{MqttConfig, MqttTransport, PubSubTransport, TransportEvent};
pub use transport::{TlsMode, TransportConfig};
