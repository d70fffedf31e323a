// ── Topic routing table ──
//
// Maps an exact topic string to the single callback that handles its
// messages. Registering a topic twice replaces the earlier callback.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

/// Callback invoked with the decoded JSON object of an inbound message.
pub type Route = Arc<dyn Fn(&Map<String, Value>) + Send + Sync>;

/// Per-session topic → route table.
#[derive(Default)]
pub struct TopicRegistry {
    routes: DashMap<String, Route>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `route` for `topic`. Returns `true` if an earlier route was
    /// replaced.
    pub fn register(&self, topic: impl Into<String>, route: Route) -> bool {
        self.routes.insert(topic.into(), route).is_some()
    }

    /// Remove the route for `topic`, if any.
    pub fn remove(&self, topic: &str) -> bool {
        self.routes.remove(topic).is_some()
    }

    /// The route for an exact topic.
    pub fn route(&self, topic: &str) -> Option<Route> {
        self.routes.get(topic).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every registered topic.
    pub fn topics(&self) -> Vec<String> {
        self.routes.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
