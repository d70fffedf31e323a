// ── Messaging session ──
//
// Owns one broker connection, the topic routing table and the reconnect
// protocol. A driver task consumes transport events: on every connect
// acknowledgement it re-subscribes to all registered topics, inbound
// messages are routed by exact topic, and an unexpected drop of an
// acknowledged link triggers exactly one re-login followed by a fresh
// connect. A link that drops before its acknowledgement, or a failed
// re-login, leaves the session disconnected until `connect` is called
// again.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use miraie_api::{Credentials, PubSubTransport, TransportAuth, TransportEvent, generate_client_id};

use crate::command::Command;
use crate::credentials::CredentialSource;
use crate::error::CoreError;
use crate::registry::{Route, TopicRegistry};

const FAILURE_CHANNEL_SIZE: usize = 16;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The link dropped and fresh credentials are being requested.
    Reauthenticating,
}

// ── MessagingSession ─────────────────────────────────────────────

/// A pub/sub session bound to one transport and one credential source.
///
/// Cheaply cloneable; clones share the same connection and routes.
#[derive(Clone)]
pub struct MessagingSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<dyn PubSubTransport>,
    credentials: Arc<dyn CredentialSource>,
    registry: TopicRegistry,
    state: watch::Sender<ConnectionState>,
    failures: broadcast::Sender<Arc<CoreError>>,
    /// The running driver, if any. Also serializes connect/disconnect.
    driver: Mutex<Option<Driver>>,
}

struct Driver {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MessagingSession {
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_SIZE);

        Self {
            inner: Arc::new(SessionInner {
                transport,
                credentials,
                registry: TopicRegistry::new(),
                state,
                failures,
                driver: Mutex::new(None),
            }),
        }
    }

    // ── Observation ──────────────────────────────────────────────

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to failures the session gave up on: a failed re-login or
    /// a link that dropped before the broker acknowledged it. Each one
    /// leaves the session disconnected.
    pub fn failures(&self) -> broadcast::Receiver<Arc<CoreError>> {
        self.inner.failures.subscribe()
    }

    /// Every topic that currently has a route.
    pub fn topics(&self) -> Vec<String> {
        self.inner.registry.topics()
    }

    // ── Routing ──────────────────────────────────────────────────

    /// Route messages on `topic` to `route`, replacing any earlier route
    /// for the same topic. Subscribes immediately if already connected.
    pub async fn register(&self, topic: impl Into<String>, route: Route) -> Result<(), CoreError> {
        let topic = topic.into();
        if self.inner.registry.register(topic.clone(), route) {
            debug!(topic = %topic, "replaced existing route");
        }

        if self.state() == ConnectionState::Connected {
            self.inner.transport.subscribe(&topic).await?;
        }
        Ok(())
    }

    /// Stop routing `topic`. Later messages on it are dropped.
    pub fn unregister(&self, topic: &str) -> bool {
        self.inner.registry.remove(topic)
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the broker, authenticating as `username` with the
    /// current access token.
    ///
    /// Returns once the connection attempt has been issued; the state
    /// moves to `Connected` when the broker acknowledges it. A no-op if
    /// the session is not currently disconnected.
    pub async fn connect(&self, username: &str) -> Result<(), CoreError> {
        let mut driver = self.inner.driver.lock().await;
        if self.state() != ConnectionState::Disconnected {
            debug!("session already active");
            return Ok(());
        }

        let credentials =
            self.inner
                .credentials
                .current()
                .ok_or_else(|| CoreError::AuthenticationFailed {
                    message: "no credentials; log in first".into(),
                })?;

        // A driver that gave up after a failed re-login may still be unwinding.
        if let Some(previous) = driver.take() {
            previous.cancel.cancel();
        }

        self.inner.set_state(ConnectionState::Connecting);
        let events = match self.inner.open(username, &credentials).await {
            Ok(events) => events,
            Err(e) => {
                self.inner.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            Arc::clone(&self.inner),
            username.to_owned(),
            events,
            cancel.clone(),
        ));
        *driver = Some(Driver { cancel, handle });
        Ok(())
    }

    /// Close the connection and stop the driver.
    ///
    /// Safe to call at any time, including mid-reconnect: an in-flight
    /// re-login or connect is abandoned rather than completed.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        let mut driver = self.inner.driver.lock().await;
        if let Some(running) = driver.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                warn!(error = %e, "session driver did not exit cleanly");
            }
        }

        let result = self.inner.transport.disconnect().await.map_err(CoreError::from);
        self.inner.set_state(ConnectionState::Disconnected);
        info!("session disconnected");
        result
    }

    // ── Publishing ───────────────────────────────────────────────

    /// Publish a command to `topic`. Fire-and-forget: the effect shows up
    /// later as an inbound status message.
    pub async fn publish(&self, topic: &str, command: &Command) -> Result<(), CoreError> {
        let payload = command.encode()?;
        if self.state() != ConnectionState::Connected {
            return Err(CoreError::NotConnected);
        }
        trace!(topic, ?command, "publishing command");
        self.inner.transport.publish(topic, payload).await?;
        Ok(())
    }
}

// ── Session internals ────────────────────────────────────────────

impl SessionInner {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = ?*current, to = ?state, "session state change");
            *current = state;
            true
        });
    }

    /// Issue a transport connect with a fresh client id.
    async fn open(
        &self,
        username: &str,
        credentials: &Credentials,
    ) -> Result<mpsc::Receiver<TransportEvent>, CoreError> {
        let auth = TransportAuth {
            username: username.to_owned(),
            password: credentials.access_token.clone(),
        };
        let client_id = generate_client_id();
        debug!(client_id = %client_id, "opening transport");
        Ok(self.transport.connect(&client_id, &auth).await?)
    }

    async fn on_connected(&self) {
        self.set_state(ConnectionState::Connected);

        let topics = self.registry.topics();
        info!(topics = topics.len(), "connected; subscribing");
        for topic in &topics {
            if let Err(e) = self.transport.subscribe(topic).await {
                warn!(topic = %topic, error = %e, "subscribe failed");
            }
        }
    }

    fn dispatch(&self, topic: &str, payload: &[u8]) {
        let Some(route) = self.registry.route(topic) else {
            debug!(topic, "no route for topic, dropping message");
            return;
        };

        let document = match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(document)) => document,
            Ok(other) => {
                let err = CoreError::MalformedMessage {
                    topic: topic.to_owned(),
                    reason: format!("expected a JSON object, got {other}"),
                };
                warn!(error = %err, "dropping message");
                return;
            }
            Err(e) => {
                let err = CoreError::MalformedMessage {
                    topic: topic.to_owned(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "dropping message");
                return;
            }
        };

        trace!(topic, ?document, "dispatching");
        if panic::catch_unwind(AssertUnwindSafe(|| route(&document))).is_err() {
            warn!(topic, "route handler panicked");
        }
    }

    /// Re-login once and reconnect. `None` means the driver should stop.
    async fn recover(
        &self,
        username: &str,
        reason: String,
        cancel: &CancellationToken,
    ) -> Option<mpsc::Receiver<TransportEvent>> {
        if cancel.is_cancelled() {
            return None;
        }

        let dropped = CoreError::TransportDisconnected { reason };
        warn!(error = %dropped, "re-authenticating before reconnect");
        self.set_state(ConnectionState::Reauthenticating);

        let refreshed = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            result = self.credentials.reauthenticate() => result,
        };
        let credentials = match refreshed {
            Ok(credentials) => credentials,
            Err(e) => {
                self.abandon(e);
                return None;
            }
        };

        if cancel.is_cancelled() {
            return None;
        }

        self.set_state(ConnectionState::Connecting);
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            result = self.open(username, &credentials) => result,
        };
        match opened {
            Ok(_) if cancel.is_cancelled() => None,
            Ok(events) => {
                info!("reconnecting with refreshed credentials");
                Some(events)
            }
            Err(e) => {
                self.abandon(e);
                None
            }
        }
    }

    fn abandon(&self, error: CoreError) {
        if error.is_credential_rejection() {
            warn!(error = %error, "credentials rejected; session is disconnected until the next login");
        } else {
            warn!(error = %error, "reconnect abandoned; session is disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
        let _ = self.failures.send(Arc::new(error));
    }
}

/// Driver task: consume transport events until cancelled or abandoned.
async fn run(
    inner: Arc<SessionInner>,
    username: String,
    mut events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
) {
    // Only a link the broker acknowledged earns a re-login when it drops.
    let mut acknowledged = false;

    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        let reason = match event {
            Some(TransportEvent::ConnAck) => {
                acknowledged = true;
                inner.on_connected().await;
                continue;
            }
            Some(TransportEvent::Message { topic, payload }) => {
                inner.dispatch(&topic, &payload);
                continue;
            }
            Some(TransportEvent::Dropped { reason }) => reason,
            None => "transport event stream closed".to_owned(),
        };

        if !acknowledged {
            if !cancel.is_cancelled() {
                inner.abandon(CoreError::TransportDisconnected { reason });
            }
            break;
        }

        match inner.recover(&username, reason, &cancel).await {
            Some(next) => {
                events = next;
                acknowledged = false;
            }
            None => break,
        }
    }

    debug!("session driver exiting");
}
