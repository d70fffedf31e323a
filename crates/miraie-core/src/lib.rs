// miraie-core: Device model, messaging session and orchestration for MirAIe air conditioners.

pub mod command;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod device;
pub mod error;
pub mod home;
pub mod model;
pub mod registry;
pub mod session;
pub mod wire;

mod convert;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::ControllerConfig;
pub use controller::Controller;
pub use credentials::{CredentialProvider, CredentialSource};
pub use device::{Device, ObserverHandle};
pub use error::CoreError;
pub use home::Home;
pub use registry::{Route, TopicRegistry};
pub use session::{ConnectionState, MessagingSession};

// API types that appear in `ControllerConfig`.
pub use miraie_api::{AuthType, Endpoints, MqttConfig, TlsMode};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DeviceIdentity, DeviceStatus, DeviceTopics, DisplayMode, FanMode, HardwareInfo, HvacMode,
    PowerMode, PresetMode, StatusSource, SwingAxes, SwingAxis, SwingMode, UNKNOWN_TEMPERATURE,
};
