use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::GateType;

/// The live, unresolved record of a gate currently blocking a task.
///
/// Created by the trigger layer when a task enters [`Blocked`] state and
/// deleted exactly once, by resolution. Never mutated in place.
///
/// [`Blocked`]: crate::domain::TaskStatus::Blocked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDecision {
    pub decision_id: String,
    pub task_id: String,
    /// Denormalized for display; the task remains the source of truth.
    pub task_title: String,
    /// The phase the task was at when the gate fired.
    pub phase: String,
    pub gate_type: GateType,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl PendingDecision {
    pub fn new(
        task_id: impl Into<String>,
        task_title: impl Into<String>,
        phase: impl Into<String>,
        gate_type: GateType,
        question: impl Into<String>,
    ) -> Self {
        Self {
            decision_id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            task_title: task_title.into(),
            phase: phase.into(),
            gate_type,
            question: question.into(),
            context: None,
            requested_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// The durable, immutable record of an adjudicated gate.
///
/// Exactly one `ResolvedDecision` corresponds to each consumed
/// [`PendingDecision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDecision {
    pub decision_id: String,
    pub task_id: String,
    pub phase: String,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}
