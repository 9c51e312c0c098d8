use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::events::ServerEvent;

/// Per-room registry of open delivery channels, keyed by caller identity
///
/// Senders are unbounded so delivery never blocks event processing; a
/// subscriber that went away simply fails its send and is skipped. The
/// registry itself is not synchronized - it only lives under the room lock.
#[derive(Default)]
pub struct SubscriberRegistry {
    channels: HashMap<String, mpsc::UnboundedSender<ServerEvent>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Registers a delivery channel, replacing any previous one for this
    /// identity
    pub fn register(&mut self, identity: &str, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.channels.insert(identity.to_string(), sender);
    }

    /// Removes the channel for an identity (no-op if absent)
    pub fn unregister(&mut self, identity: &str) {
        self.channels.remove(identity);
    }

    /// Delivers to one identity; silently drops if it is not registered or
    /// its receiver is gone
    pub fn send_to(&self, identity: &str, event: ServerEvent) {
        if let Some(sender) = self.channels.get(identity) {
            let _ = sender.send(event);
        }
    }

    /// Delivers to every registered channel, skipping any that fail
    pub fn broadcast(&self, event: ServerEvent) {
        for (identity, sender) in &self.channels {
            if sender.send(event.clone()).is_err() {
                debug!(identity = %identity, "Dropping broadcast to closed channel");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
