//! Domain error types

use super::ids::{AgentId, TaskId};
use thiserror::Error;

/// Orchestration error taxonomy.
///
/// Transient errors ([`DomainError::StallTimeout`], an agent in `error`) are
/// retried locally. [`DomainError::MaxRetriesExceeded`] and
/// [`DomainError::QuorumError`] surface to the session runner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Task already queued: {0}")]
    DuplicateTask(TaskId),

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Agent {agent} is busy (state: {state})")]
    AgentBusy { agent: AgentId, state: String },

    #[error("Capacity exceeded: {limit} agents already working")]
    CapacityExceeded { limit: usize },

    #[error("Quorum not reached: {received} of {required} council members responded")]
    QuorumError { received: usize, required: usize },

    #[error("Task {0} exceeded its stall timeout")]
    StallTimeout(TaskId),

    #[error("Retry budget exhausted after {retries} retries (limit {limit})")]
    MaxRetriesExceeded { retries: u32, limit: u32 },

    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    pub(crate) fn transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        DomainError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    /// Errors that are retried locally rather than surfaced to the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::StallTimeout(_))
    }

    /// Errors the session runner must react to as a whole.
    pub fn is_session_level(&self) -> bool {
        matches!(
            self,
            DomainError::MaxRetriesExceeded { .. } | DomainError::QuorumError { .. }
        )
    }
}
