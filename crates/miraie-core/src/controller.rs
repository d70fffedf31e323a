// ── Controller abstraction ──
//
// Wires the pieces together for one account: log in, discover the home's
// supported devices, attach each device's routes to the messaging
// session, then connect to the broker.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use miraie_api::{ApiClient, Credentials, MqttTransport, PubSubTransport};

use crate::config::ControllerConfig;
use crate::convert;
use crate::credentials::{CredentialProvider, CredentialSource};
use crate::device::Device;
use crate::error::CoreError;
use crate::home::Home;
use crate::session::{ConnectionState, MessagingSession};

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    api: Arc<ApiClient>,
    credentials: Arc<CredentialProvider>,
    session: MessagingSession,
    home: ArcSwapOption<Home>,
}

impl Controller {
    /// Create a controller talking to the configured endpoints and broker.
    /// Does NOT connect; call [`connect()`](Self::connect).
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let api = ApiClient::new(config.endpoints.clone(), &config.transport())?;
        let transport = Arc::new(MqttTransport::new(config.mqtt.clone()));
        Ok(Self::with_parts(config, api, transport))
    }

    /// Create a controller from pre-built HTTP and pub/sub clients.
    pub fn with_parts(
        config: ControllerConfig,
        api: ApiClient,
        transport: Arc<dyn PubSubTransport>,
    ) -> Self {
        let api = Arc::new(api);
        let credentials = Arc::new(CredentialProvider::new(
            Arc::clone(&api),
            config.auth_type,
            config.identifier.clone(),
            config.secret.clone(),
        ));
        let session = MessagingSession::new(
            transport,
            Arc::clone(&credentials) as Arc<dyn CredentialSource>,
        );

        Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                credentials,
                session,
                home: ArcSwapOption::empty(),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// The messaging session shared by every device.
    pub fn session(&self) -> &MessagingSession {
        &self.inner.session
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, discover devices and connect to the broker.
    ///
    /// Discovery runs once per controller. Later calls (for instance after
    /// a reported reconnect failure) log in again and reconnect the same
    /// home, so `Device` handles, observers and subscribers stay live.
    ///
    /// Login and discovery errors are returned directly. Once this returns,
    /// the broker connection proceeds in the background; watch
    /// [`connection_state()`](Self::connection_state) for progress.
    pub async fn connect(&self) -> Result<Arc<Home>, CoreError> {
        let credentials = self.inner.credentials.login().await?;

        if let Some(home) = self.home() {
            debug!(home_id = %home.id(), "reusing discovered home");
            self.inner.session.connect(home.id()).await?;
            return Ok(home);
        }

        let home = Arc::new(self.discover(&credentials).await?);

        for device in home.devices() {
            device.attach().await?;
        }
        self.inner.home.store(Some(Arc::clone(&home)));

        info!(home_id = %home.id(), devices = home.len(), "discovery complete");
        self.inner.session.connect(home.id()).await?;
        Ok(home)
    }

    /// Close the broker connection, abandoning any reconnect in flight.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        self.inner.session.disconnect().await
    }

    /// Log in again and replace the stored credentials.
    ///
    /// The session calls this path on its own after an unexpected drop.
    pub async fn reauthenticate(&self) -> Result<Arc<Credentials>, CoreError> {
        self.inner.credentials.reauthenticate().await
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.session.state_changes()
    }

    /// Subscribe to connection failures the session gave up on.
    pub fn failures(&self) -> broadcast::Receiver<Arc<CoreError>> {
        self.inner.session.failures()
    }

    // ── Devices ──────────────────────────────────────────────────

    /// The home discovered by the last successful connect.
    pub fn home(&self) -> Option<Arc<Home>> {
        self.inner.home.load_full()
    }

    /// Every discovered device, ordered by id.
    pub fn devices(&self) -> Vec<Device> {
        self.home()
            .map(|home| home.devices().cloned().collect())
            .unwrap_or_default()
    }

    /// Look up a discovered device by id.
    pub fn device(&self, device_id: &str) -> Result<Device, CoreError> {
        self.home()
            .and_then(|home| home.device(device_id).cloned())
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: device_id.to_owned(),
            })
    }

    // ── Discovery ────────────────────────────────────────────────

    /// Walk the first home's spaces and build a device for every unit of
    /// the supported category.
    async fn discover(&self, credentials: &Credentials) -> Result<Home, CoreError> {
        let api = &self.inner.api;
        let config = &self.inner.config;
        let token: &SecretString = &credentials.access_token;

        let homes = api.list_homes(token).await?;
        let Some(home) = homes.into_iter().next() else {
            return Err(CoreError::HomeNotFound);
        };

        let mut devices = Vec::new();
        for space in &home.spaces {
            for record in &space.devices {
                let details = api.get_device_details(token, &record.device_id).await?;
                if !convert::is_supported(&details, &config.category) {
                    debug!(
                        device_id = %record.device_id,
                        category = %details.category,
                        "skipping unsupported device"
                    );
                    continue;
                }

                let Some(identity) = convert::device_identity(space, record, details) else {
                    warn!(device_id = %record.device_id, "device has no topic, skipping");
                    continue;
                };

                let document = api.get_device_status(token, &record.device_id).await?;
                let status = convert::initial_status(&identity, &document);

                debug!(device_id = %identity.id, area = %identity.area, "discovered device");
                devices.push(Device::new(
                    identity,
                    status,
                    config.swing_axes,
                    self.inner.session.clone(),
                ));
            }
        }

        Ok(Home::new(home.home_id, devices))
    }
}
