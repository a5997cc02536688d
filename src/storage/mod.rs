//! Storage seams consumed by the gate/decision layer.
//!
//! The orchestrator provides durable task storage per tenant; this crate only
//! depends on the narrow traits below. [`MemoryBackend`] is the in-memory
//! reference implementation used by tests and single-process setups.

mod memory;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GateType, Task};
use crate::error::Result;
use crate::gate::ResolvedDecision;

pub use memory::{MemoryAuditSink, MemoryBackend};

/// Durable record of a gate decision as written to the audit sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditedDecision {
    pub decision_id: String,
    pub task_id: String,
    pub phase: String,
    pub gate_type: GateType,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}

impl AuditedDecision {
    pub fn to_resolved(&self) -> ResolvedDecision {
        ResolvedDecision {
            decision_id: self.decision_id.clone(),
            task_id: self.task_id.clone(),
            phase: self.phase.clone(),
            approved: self.approved,
            selected_option: None,
            reason: self.reason.clone(),
            resolved_by: self.decided_by.clone(),
            resolved_at: self.decided_at,
        }
    }
}

/// Best-effort durable sink for adjudicated gates.
///
/// Supplementary to the primary task-state transition: a failed audit write
/// degrades to a warning, never a failed resolution.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn add_gate_decision(&self, record: AuditedDecision) -> Result<()>;

    /// All audited decisions, grouped by task id.
    async fn decisions_grouped_by_task(&self) -> Result<HashMap<String, Vec<AuditedDecision>>>;
}

/// Per-tenant task storage handle.
///
/// Handles must be safe for concurrent use; the routing cache serializes
/// creation, not access.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn load_task(&self, id: &str) -> Result<Task>;

    async fn save_task(&self, task: &Task) -> Result<()>;

    async fn task_exists(&self, id: &str) -> Result<bool>;

    /// The audit sink, when this backend has one. Backends without durable
    /// audit storage return `None` and resolved-decision history is
    /// unavailable for them.
    fn audit(&self) -> Option<&dyn AuditSink> {
        None
    }

    /// Release underlying resources. Called on cache eviction and shutdown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// An opened tenant backend together with its resource path.
#[derive(Clone)]
pub struct TenantBackend {
    pub backend: Arc<dyn Backend>,
    pub path: PathBuf,
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn Backend>")
    }
}

impl std::fmt::Debug for TenantBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Resolves tenant identifiers to freshly opened backends.
///
/// Implemented by the orchestrator's tenant registry; wrapped by the routing
/// cache so each tenant is opened at most once at a time.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Open a backend for the tenant. Unknown tenants fail with
    /// [`GateError::TenantUnknown`](crate::error::GateError::TenantUnknown).
    async fn open(&self, tenant_id: &str) -> Result<TenantBackend>;
}
