use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Raised by the trigger layer when a gate fires and a pending decision
    /// is registered. Defined here as shared vocabulary; resolution itself
    /// only ever emits [`DecisionResolved`](Self::DecisionResolved).
    DecisionRequested,
    DecisionResolved,
    TaskUpdated,
    TaskFailed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionRequested => "decision.requested",
            Self::DecisionResolved => "decision.resolved",
            Self::TaskUpdated => "task.updated",
            Self::TaskFailed => "task.failed",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::TaskFailed)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried by a decision-resolved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResolvedData {
    pub decision_id: String,
    pub task_id: String,
    pub phase: String,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    DecisionResolved(DecisionResolvedData),
    Task(Box<Task>),
    Message { message: String },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub task_id: String,
    pub time: DateTime<Utc>,
    pub data: EventData,
}

impl Event {
    pub fn new(event_type: EventType, task_id: impl Into<String>) -> Self {
        Self {
            event_type,
            task_id: task_id.into(),
            time: Utc::now(),
            data: EventData::None,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    pub fn with_task(self, task: &Task) -> Self {
        self.with_data(EventData::Task(Box::new(task.clone())))
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with_data(EventData::Message {
            message: message.into(),
        })
    }

    /// The event as a JSON payload, for log and wire sinks.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
