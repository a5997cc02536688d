use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-visible outcome of a failed operation, transport-agnostic.
///
/// Every error surfaced by this crate maps to exactly one of these kinds so
/// that RPC and REST adapters can translate uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    DeadlineExceeded,
    Unavailable,
    ResourceExhausted,
    Internal,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::FailedPrecondition => "failed_precondition",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Unavailable => "unavailable",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Internal => "internal",
        }
    }

    /// Classify a collaborator error message by substring.
    ///
    /// Last-resort fallback for errors that cross a boundary we cannot
    /// retrofit with tags (hosting providers, external triggers). Tagged
    /// `GateError` variants never go through here; `GateError::status_code`
    /// resolves them directly, so a precisely-coded error cannot be
    /// misclassified by accidental keyword overlap.
    ///
    /// Only matches unambiguous keywords. Everything else is `Internal` -
    /// don't guess.
    pub fn classify(msg: &str) -> Self {
        let lower = msg.to_lowercase();
        if lower.contains("not found") || lower.contains("404") {
            return Self::NotFound;
        }
        if lower.contains("invalid")
            || lower.contains("required")
            || lower.contains("validation")
        {
            return Self::InvalidArgument;
        }
        if lower.contains("circular dependency") {
            return Self::InvalidArgument;
        }
        if lower.contains("already running")
            || lower.contains("cannot")
            || lower.contains("conflict")
        {
            return Self::FailedPrecondition;
        }
        if lower.contains("rate limit") {
            return Self::ResourceExhausted;
        }
        if lower.contains("timed out") || lower.contains("timeout") {
            return Self::DeadlineExceeded;
        }
        if lower.contains("unavailable") {
            return Self::Unavailable;
        }
        Self::Internal
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Decision not found: {0}")]
    DecisionNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Unknown tenant: {0}")]
    TenantUnknown(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task {task_id} is not blocked (status: {status})")]
    TaskNotBlocked { task_id: String, status: String },

    #[error(
        "Decision phase mismatch: task is at phase {task_phase:?}, decision is for phase {decision_phase:?}"
    )]
    PhaseMismatch {
        task_phase: String,
        decision_phase: String,
    },

    #[error("Tenant {0} specified but no tenant cache configured")]
    TenantRoutingUnavailable(String),

    #[error("No backend available")]
    NoBackend,

    #[error("Resolved decisions require a backend with an audit sink")]
    AuditUnavailable,

    #[error("A pending decision already exists for task {task_id} at phase {phase}")]
    DuplicateDecision { task_id: String, phase: String },

    #[error("Task state conflict: {0}")]
    TaskStateConflict(String),

    #[error("Failed to spawn remediation: {0}")]
    SpawnFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level passthrough: an already-classified error from a
    /// collaborator. Takes precedence over every other mapping.
    #[error("{1}")]
    Status(StatusCode, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Wrap a collaborator error message, classifying it by substring.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self::Status(StatusCode::classify(&msg), msg)
    }

    /// The caller-visible outcome kind for this error.
    ///
    /// Precedence: explicit `Status` passthrough wins, then the tag the error
    /// carried from its point of origin. Substring classification only ever
    /// happens when an error enters the crate via [`GateError::collaborator`].
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status(code, _) => *code,

            Self::DecisionNotFound(_) | Self::TaskNotFound(_) | Self::TenantUnknown(_) => {
                StatusCode::NotFound
            }

            Self::InvalidArgument(_) | Self::Config(_) => StatusCode::InvalidArgument,

            Self::TaskNotBlocked { .. }
            | Self::PhaseMismatch { .. }
            | Self::TenantRoutingUnavailable(_)
            | Self::NoBackend
            | Self::AuditUnavailable
            | Self::DuplicateDecision { .. }
            | Self::TaskStateConflict(_) => StatusCode::FailedPrecondition,

            Self::Timeout(_) | Self::Cancelled(_) => StatusCode::DeadlineExceeded,

            Self::Unavailable(_) => StatusCode::Unavailable,

            Self::RateLimited(_) => StatusCode::ResourceExhausted,

            Self::SpawnFailed(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::Internal,
        }
    }
}

impl From<serde_json::Error> for GateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for GateError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
