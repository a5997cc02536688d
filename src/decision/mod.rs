//! Decision resolution: the state machine that unblocks or fails a gated
//! task, plus resolved-decision history queries.

mod page;
mod service;

pub use page::{DEFAULT_LIMIT, DEFAULT_PAGE, PageInfo, PageRequest, paginate};
pub use service::{DEFAULT_RESOLVED_BY, DecisionService, ResolveRequest, ResolvedPage};
