//! In-process change notification hub.
//!
//! Providers publish a topic after every committed write; subscriptions hold
//! a receiver for the topics they care about and re-run their query on each
//! event, delivering the full current result set rather than a diff. The hub
//! carries no payload; the event only says "this part of the store moved".
//!
//! Topics:
//! - `matches`: any match created, touched, or deactivated
//! - `matches:{id}`: a specific match document changed (typing, summary)
//! - `messages:{match_id}`: a message appended or marked read
//! - `profiles:{uid}`: a profile created or updated

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// Topic names used by the storage providers.
pub mod topics {
    use uuid::Uuid;

    pub const MATCHES: &str = "matches";

    pub fn match_doc(id: Uuid) -> String {
        format!("matches:{}", id)
    }

    pub fn messages(match_id: Uuid) -> String {
        format!("messages:{}", match_id)
    }

    pub fn profile(uid: Uuid) -> String {
        format!("profiles:{}", uid)
    }
}

/// Topic-keyed broadcast hub. Thread-safe and cheaply cloneable.
// TODO: bridge events over Postgres LISTEN/NOTIFY so subscriptions stay live
// across multiple service processes sharing one database.
#[derive(Clone)]
pub struct ChangeHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<()>>>>,
    capacity: usize,
}

impl ChangeHub {
    /// Create a hub with the default per-topic capacity (64 pending events).
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish an event to a topic. No-op if nobody is subscribed.
    pub async fn publish(&self, topic: &str) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            // Send errors just mean there are no live receivers.
            let _ = tx.send(());
        }
    }

    /// Subscribe to a topic, creating its channel on first use.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<()> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Drop channels that no longer have subscribers.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}
