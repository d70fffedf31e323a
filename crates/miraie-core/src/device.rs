// ── Device facade ──
//
// Per-device handle: turns intents into control commands, merges routed
// status documents into the device's status, and notifies observers.
// Commands never touch local status; the device reports the effect back
// on its status topic.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::CoreError;
use crate::model::{
    DeviceIdentity, DeviceStatus, FanMode, HvacMode, MergeOutcome, PowerMode, PresetMode,
    StatusSource, SwingAxes, SwingAxis, SwingMode,
};
use crate::registry::Route;
use crate::session::MessagingSession;

/// Opaque token returned by [`Device::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

type Observer = Arc<dyn Fn() + Send + Sync>;

/// One air conditioner.
///
/// Cheaply cloneable; clones share status and observers.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    identity: DeviceIdentity,
    swing_axes: SwingAxes,
    session: MessagingSession,
    status: watch::Sender<DeviceStatus>,
    observers: DashMap<ObserverHandle, Observer>,
    next_observer: AtomicU64,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.inner.identity.id)
            .field("name", &self.inner.identity.name)
            .finish_non_exhaustive()
    }
}

impl Device {
    pub fn new(
        identity: DeviceIdentity,
        status: DeviceStatus,
        swing_axes: SwingAxes,
        session: MessagingSession,
    ) -> Self {
        let (status, _) = watch::channel(status);
        Self {
            inner: Arc::new(DeviceInner {
                identity,
                swing_axes,
                session,
                status,
                observers: DashMap::new(),
                next_observer: AtomicU64::new(0),
            }),
        }
    }

    /// Register this device's status and connection-status routes with
    /// its session.
    pub async fn attach(&self) -> Result<(), CoreError> {
        let topics = &self.inner.identity.topics;
        self.inner
            .session
            .register(topics.status.clone(), self.route(StatusSource::Status))
            .await?;
        self.inner
            .session
            .register(
                topics.connection_status.clone(),
                self.route(StatusSource::ConnectionStatus),
            )
            .await
    }

    // Routes hold a weak reference; the session must not keep devices alive.
    fn route(&self, source: StatusSource) -> Route {
        let device = Arc::downgrade(&self.inner);
        Arc::new(move |document: &Map<String, Value>| {
            if let Some(device) = device.upgrade() {
                device.apply(source, document);
            }
        })
    }

    // ── Identity & status ────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.inner.identity.id
    }

    pub fn name(&self) -> &str {
        &self.inner.identity.name
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.identity
    }

    pub fn swing_axes(&self) -> SwingAxes {
        self.inner.swing_axes
    }

    /// Point-in-time copy of the current status.
    pub fn status(&self) -> DeviceStatus {
        self.inner.status.borrow().clone()
    }

    /// Watch status snapshots as they are merged.
    pub fn subscribe(&self) -> watch::Receiver<DeviceStatus> {
        self.inner.status.subscribe()
    }

    // ── Observers ────────────────────────────────────────────────

    /// Call `observer` after every merged status update.
    pub fn add_observer<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = ObserverHandle(self.inner.next_observer.fetch_add(1, Ordering::Relaxed));
        self.inner.observers.insert(handle, Arc::new(observer));
        handle
    }

    /// Remove an observer. Returns `false` if the handle was unknown.
    pub fn remove_observer(&self, handle: ObserverHandle) -> bool {
        self.inner.observers.remove(&handle).is_some()
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn set_power(&self, mode: PowerMode) -> Result<(), CoreError> {
        self.send(Command::SetPower(mode)).await
    }

    pub async fn turn_on(&self) -> Result<(), CoreError> {
        self.set_power(PowerMode::On).await
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        self.set_power(PowerMode::Off).await
    }

    /// Set the target temperature in °C.
    pub async fn set_temperature(&self, celsius: f64) -> Result<(), CoreError> {
        self.send(Command::SetTemperature(celsius)).await
    }

    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<(), CoreError> {
        self.send(Command::SetHvacMode(mode)).await
    }

    pub async fn set_fan_mode(&self, mode: FanMode) -> Result<(), CoreError> {
        self.send(Command::SetFanMode(mode)).await
    }

    pub async fn set_preset(&self, preset: PresetMode) -> Result<(), CoreError> {
        self.send(Command::SetPreset(preset)).await
    }

    /// Move one louvre axis. Fails with `Unsupported` for the horizontal
    /// axis on single-axis units.
    pub async fn set_swing(&self, axis: SwingAxis, mode: SwingMode) -> Result<(), CoreError> {
        if !self.inner.swing_axes.supports(axis) {
            return Err(CoreError::Unsupported {
                operation: format!("{axis} swing"),
                required: "a dual-axis swing unit".into(),
            });
        }
        let command = match axis {
            SwingAxis::Vertical => Command::SetSwing {
                vertical: Some(mode),
                horizontal: None,
            },
            SwingAxis::Horizontal => Command::SetSwing {
                vertical: None,
                horizontal: Some(mode),
            },
        };
        self.send(command).await
    }

    /// Move every axis the unit has to the same position.
    pub async fn set_swing_all(&self, mode: SwingMode) -> Result<(), CoreError> {
        let horizontal = match self.inner.swing_axes {
            SwingAxes::Single => None,
            SwingAxes::Dual => Some(mode),
        };
        self.send(Command::SetSwing {
            vertical: Some(mode),
            horizontal,
        })
        .await
    }

    async fn send(&self, command: Command) -> Result<(), CoreError> {
        debug!(device_id = %self.id(), ?command, "sending command");
        self.inner
            .session
            .publish(&self.inner.identity.topics.control, &command)
            .await
    }
}

impl DeviceInner {
    fn apply(&self, source: StatusSource, document: &Map<String, Value>) {
        let topic = match source {
            StatusSource::Status => &self.identity.topics.status,
            StatusSource::ConnectionStatus => &self.identity.topics.connection_status,
        };

        let mut outcome = MergeOutcome::default();
        self.status.send_if_modified(|status| {
            outcome = status.merge(source, topic, document);
            outcome.applied()
        });

        for problem in &outcome.malformed {
            warn!(device_id = %self.identity.id, error = %problem, "ignoring malformed field");
        }

        if outcome.applied() {
            self.notify();
        }
    }

    fn notify(&self) {
        // Snapshot first so observers may add or remove observers.
        let observers: Vec<(ObserverHandle, Observer)> = self
            .observers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        for (handle, observer) in observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer())).is_err() {
                warn!(
                    device_id = %self.identity.id,
                    observer = handle.0,
                    "observer panicked"
                );
            }
        }
    }
}
