//! Gate records and the in-memory pending-decision registry.

mod pending;
mod store;

pub use pending::{PendingDecision, ResolvedDecision};
pub use store::PendingDecisionStore;
