//! Bounded-wait fire-and-forget launch of remediation work.
//!
//! A remediation request must return to its caller quickly even though the
//! underlying work may run for minutes, but the caller still wants to know if
//! the work could not even start. The spawner races the work's result channel
//! against a short fixed timeout: fast failures are surfaced (with
//! compensating task state rollback), anything slower is treated as
//! accepted-and-running and observed only through its own event emissions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::domain::{Task, TaskStatus};
use crate::error::{GateError, Result};
use crate::notification::{Event, EventType, Publisher};
use crate::storage::Backend;

/// How long to wait for an immediate failure before detaching.
pub const DEFAULT_SPAWN_WAIT: Duration = Duration::from_millis(10);

/// Upper bound on remediation context carried into the retry note.
pub const MAX_CONTEXT_BYTES: usize = 10 * 1024;

/// A validated request to re-run a task phase with remediation context.
#[derive(Debug, Clone)]
pub struct RemediationRequest {
    pub task_id: String,
    /// Phase to re-run, e.g. "implement".
    pub phase: String,
    /// Short label for why the phase is re-run.
    pub note: String,
    /// Free-form context handed to the executor; truncated to
    /// [`MAX_CONTEXT_BYTES`].
    pub context: String,
}

impl RemediationRequest {
    pub fn new(task_id: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            phase: phase.into(),
            note: String::new(),
            context: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.task_id.is_empty() {
            return Err(GateError::InvalidArgument("task_id is required".into()));
        }
        if self.phase.is_empty() {
            return Err(GateError::InvalidArgument("phase is required".into()));
        }
        Ok(())
    }
}

/// Launches long-running work without blocking the calling request.
pub struct AsyncSpawner {
    publisher: Arc<dyn Publisher>,
    wait: Duration,
}

impl AsyncSpawner {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher,
            wait: DEFAULT_SPAWN_WAIT,
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Prepare a task for remediation: validate state, attach retry context,
    /// bump the retry counter, mark it running at the remediation phase, and
    /// persist - all before anything is spawned.
    pub async fn prepare(
        &self,
        backend: &Arc<dyn Backend>,
        request: &RemediationRequest,
    ) -> Result<Task> {
        request.validate()?;

        let mut task = backend.load_task(&request.task_id).await?;

        if task.status == TaskStatus::Running {
            return Err(GateError::TaskStateConflict(
                "task is already running".into(),
            ));
        }
        if task.status == TaskStatus::Completed {
            return Err(GateError::TaskStateConflict("task already completed".into()));
        }
        if task.branch.as_deref().unwrap_or_default().is_empty() {
            return Err(GateError::TaskStateConflict("task has no branch".into()));
        }

        let context = truncate_at_char_boundary(&request.context, MAX_CONTEXT_BYTES);
        task.set_retry_context(&request.phase, &request.note, context);
        task.quality.total_retries += 1;
        task.mark_started();
        task.current_phase = Some(request.phase.clone());

        backend.save_task(&task).await?;

        self.publisher
            .publish(Event::new(EventType::TaskUpdated, &task.id).with_task(&task));

        Ok(task)
    }

    /// Launch `work` on an independent task, waiting only [`Self::wait`] for
    /// an immediate failure.
    ///
    /// If the work errors (or drops its result channel) within the window,
    /// the governing task is marked `Failed`, the spawn error is recorded on
    /// its execution state, a failure event is published, and the error is
    /// returned - the caller has not yet been told "accepted" at that point.
    /// If the window elapses, the call returns `Ok` and the work continues
    /// detached; its eventual outcome is not supervised here.
    pub async fn spawn<F>(&self, task: Task, backend: Arc<dyn Backend>, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(work.await);
        });

        match tokio::time::timeout(self.wait, rx).await {
            Ok(Ok(Ok(()))) => {
                // Completed within the window - unusual but valid.
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                let msg = e.to_string();
                self.fail_task(task, &backend, &msg).await;
                Err(GateError::SpawnFailed(msg))
            }
            Ok(Err(_dropped)) => {
                let msg = "remediation task dropped its result channel".to_string();
                self.fail_task(task, &backend, &msg).await;
                Err(GateError::SpawnFailed(msg))
            }
            Err(_elapsed) => {
                // Still running: accepted. From here on the work reports
                // through its own events.
                info!(wait_ms = self.wait.as_millis() as u64, "remediation detached");
                Ok(())
            }
        }
    }

    /// Prepare and launch in one call.
    pub async fn remediate<F>(
        &self,
        backend: Arc<dyn Backend>,
        request: RemediationRequest,
        work: F,
    ) -> Result<Task>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let task = self.prepare(&backend, &request).await?;
        self.spawn(task.clone(), Arc::clone(&backend), work).await?;
        Ok(task)
    }

    /// Compensate for a fast spawn failure: the caller was about to be told
    /// "accepted", so roll the task forward into a visible failure instead.
    async fn fail_task(&self, mut task: Task, backend: &Arc<dyn Backend>, msg: &str) {
        warn!(task_id = %task.id, error = %msg, "remediation failed within spawn window");
        task.status = TaskStatus::Failed;
        task.execution.error = Some(format!("failed to spawn remediation: {msg}"));
        task.touch();
        if let Err(e) = backend.save_task(&task).await {
            error!(task_id = %task.id, error = %e, "failed to save task after spawn failure");
        }
        self.publisher
            .publish(Event::new(EventType::TaskFailed, &task.id).with_message(msg));
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
fn truncate_at_char_boundary(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "héllo".repeat(2048); // multibyte content larger than the cap
        let truncated = truncate_at_char_boundary(&s, MAX_CONTEXT_BYTES);
        assert!(truncated.len() <= MAX_CONTEXT_BYTES);
        assert!(s.starts_with(&truncated));

        assert_eq!(truncate_at_char_boundary("short", MAX_CONTEXT_BYTES), "short");
    }

    #[test]
    fn request_validation() {
        assert!(RemediationRequest::new("", "implement").validate().is_err());
        assert!(RemediationRequest::new("T001", "").validate().is_err());
        assert!(RemediationRequest::new("T001", "implement")
            .validate()
            .is_ok());
    }
}
