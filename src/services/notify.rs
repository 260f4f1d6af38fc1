// src/services/notify.rs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Event name for the once-per-second countdown tick of a running session.
pub const TICK_EVENT: &str = "session-tick";

/// Event name for the end-of-session notification (success or error).
pub const FINISHED_EVENT: &str = "session-finished";

/// Channel key for one user's attempt at one exam.
pub fn session_channel(user_id: i64, exam_id: i64) -> String {
    format!("session.{}.{}", user_id, exam_id)
}

/// One event as delivered to channel subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: String,
    pub payload: Value,
}

/// Fire-and-forget event delivery, scoped by a channel key.
///
/// Emission is best-effort: no acknowledgment, no retry. Implementations
/// must never fail the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, channel: &str, event: &str, payload: Value);
}

/// In-process sink backed by one broadcast channel per key. SSE handlers
/// subscribe; emits to channels nobody listens on are dropped.
pub struct BroadcastNotifier {
    channels: Mutex<HashMap<String, broadcast::Sender<Notification>>>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        BroadcastNotifier {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribes to a channel, creating it if needed.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.lock().expect("notifier lock poisoned");
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn emit(&self, channel: &str, event: &str, payload: Value) {
        let mut channels = self.channels.lock().expect("notifier lock poisoned");
        let Some(tx) = channels.get(channel) else {
            tracing::trace!("dropping '{}' event for idle channel {}", event, channel);
            return;
        };

        if tx.receiver_count() == 0 {
            // Last subscriber went away; reclaim the channel.
            channels.remove(channel);
            return;
        }

        let _ = tx.send(Notification {
            event: event.to_string(),
            payload,
        });
    }
}
