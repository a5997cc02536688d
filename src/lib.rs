//! phasegate - gate/decision control plane for a multi-tenant task
//! orchestrator.
//!
//! Long-running tasks move through workflow phases; some phases end at a
//! gate that needs a human or policy decision before the task may continue.
//! This crate owns the subsystems that make that safe:
//!
//! - [`gate`]: the in-memory pending-decision registry (one live decision per
//!   blocking event).
//! - [`decision`]: the resolution state machine that validates a decision
//!   against current task state, commits the outcome, and unblocks or fails
//!   the task.
//! - [`routing`]: the per-tenant backend cache every service call goes
//!   through, with strict no-fallback tenant isolation.
//! - [`spawn`]: bounded-wait fire-and-forget launch of remediation work.
//!
//! Transports, hosting-provider clients, and workflow templates live
//! elsewhere; this crate consumes them through the narrow traits in
//! [`storage`] and [`notification`].

pub mod config;
pub mod decision;
pub mod domain;
pub mod error;
pub mod gate;
pub mod notification;
pub mod routing;
pub mod spawn;
pub mod storage;

pub use config::PhasegateConfig;
pub use decision::{DecisionService, PageInfo, PageRequest, ResolveRequest, ResolvedPage};
pub use domain::{GateRecord, GateType, Task, TaskStatus};
pub use error::{GateError, Result, StatusCode};
pub use gate::{PendingDecision, PendingDecisionStore, ResolvedDecision};
pub use notification::{BroadcastPublisher, Event, EventType, LogPublisher, Publisher};
pub use routing::{BackendRouter, TenantCache};
pub use spawn::{AsyncSpawner, RemediationRequest};
pub use storage::{AuditSink, AuditedDecision, Backend, MemoryBackend, TenantBackend, TenantRegistry};
