#![allow(dead_code)]
// In-process fakes shared by the session and controller tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use miraie_api::{Credentials, PubSubTransport, TransportAuth, TransportEvent};
use miraie_core::{CoreError, CredentialSource};

// ── Call log ────────────────────────────────────────────────────────

/// Everything the fakes were asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect {
        client_id: String,
        username: String,
        password: String,
    },
    Subscribe(String),
    Publish {
        topic: String,
        payload: Value,
    },
    Disconnect,
    Reauthenticate,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

// ── FakeTransport ───────────────────────────────────────────────────

/// Records calls and lets the test inject transport events.
pub struct FakeTransport {
    log: CallLog,
    sender: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    hold: AtomicBool,
    release: Notify,
}

impl FakeTransport {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            sender: Mutex::new(None),
            hold: AtomicBool::new(false),
            release: Notify::new(),
        }
    }

    /// Make later `connect` calls block until [`release_connects`].
    ///
    /// [`release_connects`]: Self::release_connects
    pub fn hold_connects(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release_connects(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// Deliver an event on the most recent connection.
    pub async fn emit(&self, event: TransportEvent) {
        let sender = self.sender.lock().unwrap().clone();
        sender
            .expect("emit before connect")
            .send(event)
            .await
            .unwrap();
    }

    pub async fn message(&self, topic: &str, payload: &str) {
        self.emit(TransportEvent::Message {
            topic: topic.into(),
            payload: Bytes::copy_from_slice(payload.as_bytes()),
        })
        .await;
    }

    /// Close the current event stream without a drop notification.
    pub fn close(&self) {
        *self.sender.lock().unwrap() = None;
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PubSubTransport for FakeTransport {
    async fn connect(
        &self,
        client_id: &str,
        auth: &TransportAuth,
    ) -> Result<mpsc::Receiver<TransportEvent>, miraie_api::Error> {
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock().unwrap() = Some(tx);
        let released = self.release.notified();
        self.record(Call::Connect {
            client_id: client_id.into(),
            username: auth.username.clone(),
            password: auth.password.expose_secret().to_owned(),
        });
        if self.hold.load(Ordering::SeqCst) {
            released.await;
        }
        Ok(rx)
    }

    async fn subscribe(&self, topic: &str) -> Result<(), miraie_api::Error> {
        self.record(Call::Subscribe(topic.into()));
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), miraie_api::Error> {
        self.record(Call::Publish {
            topic: topic.into(),
            payload: serde_json::from_slice(&payload).unwrap(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), miraie_api::Error> {
        self.record(Call::Disconnect);
        *self.sender.lock().unwrap() = None;
        Ok(())
    }
}

// ── FakeCredentials ─────────────────────────────────────────────────

/// How `reauthenticate` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reauth {
    Succeed,
    Fail,
    Hang,
}

pub struct FakeCredentials {
    log: CallLog,
    behaviour: Reauth,
    issued: AtomicUsize,
    current: Mutex<Option<Arc<Credentials>>>,
}

impl FakeCredentials {
    /// Starts out holding `token-1`.
    pub fn new(log: CallLog, behaviour: Reauth) -> Self {
        Self {
            log,
            behaviour,
            issued: AtomicUsize::new(1),
            current: Mutex::new(Some(Arc::new(credentials("token-1")))),
        }
    }

    pub fn empty(log: CallLog) -> Self {
        let fake = Self::new(log, Reauth::Succeed);
        *fake.current.lock().unwrap() = None;
        fake
    }
}

#[async_trait]
impl CredentialSource for FakeCredentials {
    fn current(&self) -> Option<Arc<Credentials>> {
        self.current.lock().unwrap().clone()
    }

    async fn reauthenticate(&self) -> Result<Arc<Credentials>, CoreError> {
        self.log.lock().unwrap().push(Call::Reauthenticate);
        match self.behaviour {
            Reauth::Succeed => {
                let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
                let fresh = Arc::new(credentials(&format!("token-{n}")));
                *self.current.lock().unwrap() = Some(Arc::clone(&fresh));
                Ok(fresh)
            }
            Reauth::Fail => Err(CoreError::AuthenticationFailed {
                message: "password changed".into(),
            }),
            Reauth::Hang => std::future::pending().await,
        }
    }
}

pub fn credentials(token: &str) -> Credentials {
    Credentials {
        access_token: SecretString::from(token.to_string()),
        refresh_token: SecretString::from("refresh".to_string()),
        user_id: "user-1".into(),
        expires_in: 3600,
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

pub fn count(log: &CallLog, pred: impl Fn(&Call) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|c| pred(c)).count()
}

pub fn connects(log: &CallLog) -> usize {
    count(log, |c| matches!(c, Call::Connect { .. }))
}

pub fn subscribes(log: &CallLog) -> usize {
    count(log, |c| matches!(c, Call::Subscribe(_)))
}
