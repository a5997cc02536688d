use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{GateRecord, TaskStatus};
use crate::error::{GateError, Result};
use crate::gate::{PendingDecision, PendingDecisionStore, ResolvedDecision};
use crate::notification::{DecisionResolvedData, Event, EventData, EventType, Publisher};
use crate::routing::BackendRouter;
use crate::storage::AuditedDecision;

use super::page::{PageInfo, PageRequest, paginate};

/// Identity recorded on a resolution when the caller does not supply one.
pub const DEFAULT_RESOLVED_BY: &str = "api";

/// A request to adjudicate a pending decision.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub decision_id: String,
    pub approved: bool,
    pub reason: Option<String>,
    pub resolved_by: Option<String>,
    pub selected_option: Option<String>,
    pub tenant_id: Option<String>,
}

impl ResolveRequest {
    pub fn new(decision_id: impl Into<String>, approved: bool) -> Self {
        Self {
            decision_id: decision_id.into(),
            approved,
            reason: None,
            resolved_by: None,
            selected_option: None,
            tenant_id: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_resolved_by(mut self, resolved_by: impl Into<String>) -> Self {
        self.resolved_by = Some(resolved_by.into());
        self
    }

    pub fn with_selected_option(mut self, option: impl Into<String>) -> Self {
        self.selected_option = Some(option.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

/// A page of resolved decisions.
#[derive(Debug, Clone)]
pub struct ResolvedPage {
    pub decisions: Vec<ResolvedDecision>,
    pub page: PageInfo,
}

/// The decision-resolution state machine.
///
/// Validates a resolution against current task state, commits the gate
/// outcome, transitions task status, persists history, emits the
/// decision-resolved event and removes the pending entry, in that order.
///
/// Consistency between "task status changed" and "decision removed" is by
/// ordering, not by transaction: the status commit lands before the pending
/// entry disappears. A crash in between leaves a dangling pending decision
/// whose task is no longer blocked; reconciliation may discard such entries.
///
/// No task-level lock is taken. A second resolution of the same decision
/// fails `NotFound` once the entry is removed, which is what prevents
/// double-application; concurrent non-decision writers of the same task must
/// bring their own mutual exclusion.
pub struct DecisionService {
    store: Arc<PendingDecisionStore>,
    router: Arc<BackendRouter>,
    publisher: Arc<dyn Publisher>,
}

impl DecisionService {
    pub fn new(
        store: Arc<PendingDecisionStore>,
        router: Arc<BackendRouter>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            store,
            router,
            publisher,
        }
    }

    /// All pending decisions, optionally filtered by task id.
    pub fn list_pending(&self, task_filter: Option<&str>) -> Vec<PendingDecision> {
        let mut decisions = self.store.list();
        if let Some(task_id) = task_filter {
            decisions.retain(|d| d.task_id == task_id);
        }
        decisions
    }

    pub fn get_pending(&self, id: &str) -> Result<PendingDecision> {
        self.store
            .get(id)
            .ok_or_else(|| GateError::DecisionNotFound(id.to_string()))
    }

    /// Resolve a pending decision (approve or reject).
    ///
    /// Fails before any mutation on: unknown decision, unknown task, task not
    /// blocked, or a stale decision whose recorded phase is no longer the
    /// task's current phase. Approval moves the task to `Planned`, rejection
    /// to `Failed`; the gate record is appended to task history either way.
    /// The audit-sink write is best-effort and degrades to a warning.
    ///
    /// Cancellation is honored between committed steps. Once the first
    /// persist has happened the sequence runs to completion so task state,
    /// the audit trail, and the pending store cannot drift within a single
    /// call; callers that error out should re-fetch the task to learn what
    /// actually committed.
    pub async fn resolve(
        &self,
        request: ResolveRequest,
        cancel: &CancellationToken,
    ) -> Result<ResolvedDecision> {
        ensure_live(cancel)?;

        let tenant_id = request.tenant_id.as_deref().unwrap_or_default();
        let backend = self.router.backend_for(tenant_id).await?;

        let decision = self
            .store
            .get(&request.decision_id)
            .ok_or_else(|| GateError::DecisionNotFound(request.decision_id.clone()))?;

        ensure_live(cancel)?;
        let mut task = backend.load_task(&decision.task_id).await?;

        if task.status != TaskStatus::Blocked {
            return Err(GateError::TaskNotBlocked {
                task_id: task.id.clone(),
                status: task.status.to_string(),
            });
        }

        // Defend against stale decisions issued for a phase the task has
        // since left (retry, manual phase change).
        let current_phase = task.current_phase().to_string();
        if current_phase != decision.phase {
            return Err(GateError::PhaseMismatch {
                task_phase: current_phase,
                decision_phase: decision.phase.clone(),
            });
        }

        let now = Utc::now();
        let reason = request.reason.filter(|r| !r.is_empty());
        let selected_option = request.selected_option.filter(|o| !o.is_empty());
        let resolved_by = request
            .resolved_by
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_RESOLVED_BY.to_string());

        ensure_live(cancel)?;

        // Point of no return: from here the sequence runs to completion.
        task.record_gate(GateRecord {
            phase: decision.phase.clone(),
            gate_type: decision.gate_type,
            approved: request.approved,
            reason: reason.clone(),
            timestamp: now,
        });
        backend.save_task(&task).await?;

        if let Some(sink) = backend.audit() {
            let audited = AuditedDecision {
                decision_id: decision.decision_id.clone(),
                task_id: decision.task_id.clone(),
                phase: decision.phase.clone(),
                gate_type: decision.gate_type,
                approved: request.approved,
                reason: reason.clone(),
                decided_by: resolved_by.clone(),
                decided_at: now,
            };
            // The primary task-state transition is the source of truth; the
            // audit trail is supplementary.
            if let Err(e) = sink.add_gate_decision(audited).await {
                warn!(
                    decision_id = %decision.decision_id,
                    error = %e,
                    "failed to record gate decision in audit sink"
                );
            }
        }

        task.status = if request.approved {
            TaskStatus::Planned
        } else {
            TaskStatus::Failed
        };
        task.touch();
        backend.save_task(&task).await?;

        self.publisher.publish(
            Event::new(EventType::DecisionResolved, &decision.task_id).with_data(
                EventData::DecisionResolved(DecisionResolvedData {
                    decision_id: decision.decision_id.clone(),
                    task_id: decision.task_id.clone(),
                    phase: decision.phase.clone(),
                    approved: request.approved,
                    reason: reason.clone(),
                    resolved_by: resolved_by.clone(),
                    resolved_at: now,
                }),
            ),
        );

        self.store.remove(&decision.decision_id);

        info!(
            decision_id = %decision.decision_id,
            task_id = %decision.task_id,
            approved = request.approved,
            "decision resolved"
        );

        Ok(ResolvedDecision {
            decision_id: decision.decision_id,
            task_id: decision.task_id,
            phase: decision.phase,
            approved: request.approved,
            selected_option,
            reason,
            resolved_by,
            resolved_at: now,
        })
    }

    /// Historical resolved decisions from the backend's audit sink, newest
    /// first, optionally filtered by task, paginated.
    pub async fn list_resolved(
        &self,
        task_filter: Option<&str>,
        page: PageRequest,
        tenant_id: Option<&str>,
    ) -> Result<ResolvedPage> {
        let backend = self
            .router
            .backend_for(tenant_id.unwrap_or_default())
            .await?;
        let sink = backend.audit().ok_or(GateError::AuditUnavailable)?;

        let grouped = sink.decisions_grouped_by_task().await?;
        let mut decisions: Vec<ResolvedDecision> = grouped
            .into_iter()
            .filter(|(task_id, _)| task_filter.is_none_or(|f| f == task_id.as_str()))
            .flat_map(|(_, records)| records)
            .map(|record| record.to_resolved())
            .collect();
        decisions.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));

        let (decisions, page) = paginate(decisions, page);
        Ok(ResolvedPage { decisions, page })
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(GateError::Cancelled("decision resolution".into()));
    }
    Ok(())
}
