use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::Event;

/// Fire-and-forget event publication.
///
/// At-most-once delivery: implementations must never block the caller waiting
/// for subscriber acknowledgment, and a publish with no listeners is not an
/// error.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: Event);
}

/// Publisher that only logs events. Useful as a default when no event bus is
/// wired up.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, event: Event) {
        match event.to_json() {
            Ok(payload) => debug!(
                event = event.event_type.as_str(),
                task_id = %event.task_id,
                payload = %payload,
                "event published"
            ),
            Err(e) => warn!(
                event = event.event_type.as_str(),
                task_id = %event.task_id,
                error = %e,
                "failed to serialize event payload"
            ),
        }
    }
}

/// Publisher backed by a tokio broadcast channel.
///
/// Lossy by design: lagging or absent receivers never hold up the publisher.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<Event>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, event: Event) {
        // send only fails when there are no receivers; that's fine.
        let _ = self.tx.send(event);
    }
}
