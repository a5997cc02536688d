//! Decision and task lifecycle events.

mod events;
mod publisher;

pub use events::{DecisionResolvedData, Event, EventData, EventType};
pub use publisher::{BroadcastPublisher, LogPublisher, Publisher};
