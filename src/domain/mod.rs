//! Core domain types - pure data, framework-independent.
//!
//! These types are owned by the wider orchestrator; the gate/decision layer
//! reads and mutates only what resolution and remediation need.

mod status;
mod task;

pub use status::{GateType, TaskStatus};
pub use task::{ExecutionState, GateRecord, QualityCounters, RetryContext, Task};
