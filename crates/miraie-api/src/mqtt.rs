//! MQTT transport for the MirAIe broker.
//!
//! [`PubSubTransport`] is the seam between the session logic in
//! `miraie-core` and a concrete pub/sub client. [`MqttTransport`] implements
//! it on top of `rumqttc`: each [`connect`](PubSubTransport::connect) builds a
//! fresh client, spawns a task that drives the `rumqttc` event loop, and hands
//! back an `mpsc` receiver of [`TransportEvent`]s. The event loop never
//! reconnects on its own; when the connection drops it reports
//! [`TransportEvent::Dropped`] and exits, leaving reconnect policy (and fresh
//! credentials) to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use miraie_api::mqtt::{MqttConfig, MqttTransport, PubSubTransport, TransportEvent};
//!
//! let transport = MqttTransport::new(MqttConfig::default());
//! let mut events = transport.connect(&generate_client_id(), &auth).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let TransportEvent::ConnAck = event {
//!         transport.subscribe("user/home/device/status").await?;
//!     }
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Incoming, MqttOptions, QoS};
use secrecy::ExposeSecret;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::auth::TransportAuth;
use crate::error::Error;

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;
const REQUEST_CAPACITY: usize = 64;

// ── TransportEvent ───────────────────────────────────────────────────

/// Something the transport's network loop observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker acknowledged the connection.
    ConnAck,
    /// A message arrived on a subscribed topic.
    Message { topic: String, payload: Bytes },
    /// The connection dropped without the caller asking for it.
    /// No further events follow on this receiver.
    Dropped { reason: String },
}

// ── PubSubTransport ──────────────────────────────────────────────────

/// A publish/subscribe client capability.
///
/// Implementations own their network loop; events flow back through the
/// receiver returned by `connect`. All deliveries are at-least-once.
#[async_trait]
pub trait PubSubTransport: Send + Sync + 'static {
    /// Open a new connection with the given client id and auth material.
    ///
    /// Any previous connection is torn down first.
    async fn connect(
        &self,
        client_id: &str,
        auth: &TransportAuth,
    ) -> Result<mpsc::Receiver<TransportEvent>, Error>;

    /// Subscribe to a topic at at-least-once delivery.
    async fn subscribe(&self, topic: &str) -> Result<(), Error>;

    /// Publish a payload to a topic at at-least-once delivery.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), Error>;

    /// Close the connection and stop the network loop.
    async fn disconnect(&self) -> Result<(), Error>;
}

// ── MqttConfig ───────────────────────────────────────────────────────

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// Keep-alive interval; governs how fast a dead link is detected.
    pub keep_alive: Duration,
    pub clean_session: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "mqtt.miraie.in".into(),
            port: 8883,
            use_tls: true,
            keep_alive: Duration::from_secs(60),
            clean_session: false,
        }
    }
}

impl MqttConfig {
    /// Translate into `rumqttc` options for one connection attempt.
    pub fn to_options(&self, client_id: &str, auth: &TransportAuth) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(self.clean_session);
        options.set_credentials(auth.username.clone(), auth.password.expose_secret());
        if self.use_tls {
            options.set_transport(rumqttc::Transport::tls_with_default_config());
        }
        options
    }
}

// ── MqttTransport ────────────────────────────────────────────────────

struct Link {
    client: AsyncClient,
    cancel: CancellationToken,
}

/// `rumqttc`-backed [`PubSubTransport`].
pub struct MqttTransport {
    config: MqttConfig,
    link: Mutex<Option<Link>>,
}

impl MqttTransport {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
        }
    }

    /// The broker settings this transport connects with.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    async fn client(&self) -> Result<AsyncClient, Error> {
        self.link
            .lock()
            .await
            .as_ref()
            .map(|link| link.client.clone())
            .ok_or(Error::NotConnected)
    }
}

#[async_trait]
impl PubSubTransport for MqttTransport {
    async fn connect(
        &self,
        client_id: &str,
        auth: &TransportAuth,
    ) -> Result<mpsc::Receiver<TransportEvent>, Error> {
        let mut link = self.link.lock().await;
        if let Some(previous) = link.take() {
            previous.cancel.cancel();
        }

        info!(
            host = %self.config.host,
            port = self.config.port,
            client_id,
            "connecting to MQTT broker"
        );

        let options = self.config.to_options(client_id, auth);
        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        tokio::spawn(drive_event_loop(event_loop, event_tx, cancel.clone()));

        *link = Some(Link { client, cancel });
        Ok(event_rx)
    }

    async fn subscribe(&self, topic: &str) -> Result<(), Error> {
        debug!(topic, "subscribing");
        self.client()
            .await?
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(Error::from)
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), Error> {
        trace!(topic, bytes = payload.len(), "publishing");
        self.client()
            .await?
            .publish(topic, QoS::AtLeastOnce, false, payload.to_vec())
            .await
            .map_err(Error::from)
    }

    async fn disconnect(&self) -> Result<(), Error> {
        let Some(link) = self.link.lock().await.take() else {
            return Ok(());
        };

        // Best effort: the network loop may already be gone.
        if let Err(e) = link.client.disconnect().await {
            debug!(error = %e, "MQTT disconnect request not delivered");
        }
        link.cancel.cancel();
        info!("MQTT transport closed");
        Ok(())
    }
}

// ── Network loop ─────────────────────────────────────────────────────

/// Poll the `rumqttc` event loop until cancelled or the link drops.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    event_tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            polled = event_loop.poll() => match translate(polled) {
                Some(event) => event,
                None => continue,
            },
        };

        let terminal = matches!(event, TransportEvent::Dropped { .. });
        if terminal && cancel.is_cancelled() {
            break;
        }
        if event_tx.send(event).await.is_err() {
            debug!("event receiver gone, stopping MQTT loop");
            break;
        }
        if terminal {
            break;
        }
    }

    debug!("MQTT event loop exiting");
}

/// Map one `rumqttc` poll result onto a [`TransportEvent`], if it matters.
fn translate(polled: Result<Event, rumqttc::ConnectionError>) -> Option<TransportEvent> {
    match polled {
        Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
            if ack.code == ConnectReturnCode::Success {
                info!(session_present = ack.session_present, "MQTT connected");
                Some(TransportEvent::ConnAck)
            } else {
                warn!(code = ?ack.code, "MQTT connection refused");
                Some(TransportEvent::Dropped {
                    reason: format!("connection refused: {:?}", ack.code),
                })
            }
        }
        Ok(Event::Incoming(Incoming::Publish(publish))) => Some(TransportEvent::Message {
            topic: publish.topic,
            payload: publish.payload,
        }),
        Ok(Event::Incoming(Incoming::Disconnect)) => Some(TransportEvent::Dropped {
            reason: "broker closed the connection".into(),
        }),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "MQTT connection lost");
            Some(TransportEvent::Dropped {
                reason: e.to_string(),
            })
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, Publish};
    use secrecy::SecretString;

    fn auth() -> TransportAuth {
        TransportAuth {
            username: "home-1".into(),
            password: SecretString::from("token-abc".to_string()),
        }
    }

    #[test]
    fn default_config_targets_cloud_broker() {
        let config = MqttConfig::default();
        assert_eq!(config.host, "mqtt.miraie.in");
        assert_eq!(config.port, 8883);
        assert!(config.use_tls);
        assert!(!config.clean_session);
    }

    #[test]
    fn options_carry_client_id_and_credentials() {
        let config = MqttConfig {
            use_tls: false,
            ..MqttConfig::default()
        };
        let options = config.to_options("an123", &auth());

        assert_eq!(options.client_id(), "an123");
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(
            options.credentials(),
            Some(("home-1".to_string(), "token-abc".to_string()))
        );
        assert_eq!(
            options.broker_address(),
            ("mqtt.miraie.in".to_string(), 8883)
        );
    }

    #[test]
    fn successful_connack_maps_to_connack() {
        let ack = ConnAck::new(ConnectReturnCode::Success, false);
        assert_eq!(
            translate(Ok(Event::Incoming(Incoming::ConnAck(ack)))),
            Some(TransportEvent::ConnAck)
        );
    }

    #[test]
    fn refused_connack_is_a_drop() {
        let ack = ConnAck::new(ConnectReturnCode::BadUserNamePassword, false);
        assert!(matches!(
            translate(Ok(Event::Incoming(Incoming::ConnAck(ack)))),
            Some(TransportEvent::Dropped { .. })
        ));
    }

    #[test]
    fn publish_maps_to_message() {
        let publish = Publish::new("a/status", QoS::AtLeastOnce, br#"{"ps":"on"}"#.to_vec());
        assert_eq!(
            translate(Ok(Event::Incoming(Incoming::Publish(publish)))),
            Some(TransportEvent::Message {
                topic: "a/status".into(),
                payload: Bytes::from_static(br#"{"ps":"on"}"#),
            })
        );
    }

    #[test]
    fn outgoing_traffic_is_ignored() {
        assert_eq!(
            translate(Ok(Event::Outgoing(rumqttc::Outgoing::PingReq))),
            None
        );
    }

    #[tokio::test]
    async fn publish_without_connection_fails() {
        let transport = MqttTransport::new(MqttConfig::default());
        let result = transport.publish("a/control", Bytes::from_static(b"{}")).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_noop() {
        let transport = MqttTransport::new(MqttConfig::default());
        assert!(transport.disconnect().await.is_ok());
    }
}
