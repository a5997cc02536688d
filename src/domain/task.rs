use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{GateType, TaskStatus};

/// One adjudicated gate, appended to a task's execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRecord {
    pub phase: String,
    pub gate_type: GateType,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Context attached to a task when a phase is re-run (gate rejection followed
/// by relaunch, or remediation of review feedback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryContext {
    pub phase: String,
    pub note: String,
    pub context: String,
    pub attempt: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionState {
    pub gates: Vec<GateRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryContext>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCounters {
    pub total_retries: u32,
}

/// A unit of orchestrated work.
///
/// Owned by the wider orchestrator; this crate only reads and mutates the
/// fields the gate/decision layer needs (status, current phase, gate history,
/// retry counters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    pub execution: ExecutionState,
    pub quality: QualityCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            branch: None,
            status: TaskStatus::Created,
            current_phase: None,
            execution: ExecutionState::default(),
            quality: QualityCounters::default(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.current_phase = Some(phase.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// The phase the task is currently at, recomputed from live state.
    ///
    /// Resolution compares this against the phase recorded on a pending
    /// decision; a retry or manual phase change between gate firing and
    /// resolution makes the decision stale.
    pub fn current_phase(&self) -> &str {
        self.current_phase.as_deref().unwrap_or_default()
    }

    /// Append a gate decision to the execution history.
    pub fn record_gate(&mut self, record: GateRecord) {
        self.execution.gates.push(record);
        self.touch();
    }

    /// Set the retry context for a phase re-run, bumping the attempt counter.
    pub fn set_retry_context(
        &mut self,
        phase: impl Into<String>,
        note: impl Into<String>,
        context: impl Into<String>,
    ) {
        let attempt = self.quality.total_retries + 1;
        self.execution.retry = Some(RetryContext {
            phase: phase.into(),
            note: note.into(),
            context: context.into(),
            attempt,
        });
        self.touch();
    }

    pub fn mark_started(&mut self) {
        self.status = TaskStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
