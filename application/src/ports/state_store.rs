//! State persistence ports
//!
//! The run's state lives in a state directory so that out-of-process
//! commands (`status`, `dead-letters`, `reset`) can read it. Adapters live in
//! the infrastructure layer; in-memory doubles live in the tests.

use async_trait::async_trait;
use autopilot_domain::{
    AgentId, ConvergenceEntry, CouncilRound, CouncilState, DeadLetterEntry, SessionStatus, TaskId,
    TaskQueue,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing run state
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// A task currently bound to an agent, as recorded in `current-task.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub description: String,
    pub started_at: DateTime<Utc>,
}

/// Persistence of the task queue and its dead-letter log
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Write the full queue snapshot (and the ordered list of queued tasks).
    async fn save_queue(&self, queue: &TaskQueue) -> Result<(), StoreError>;

    /// Replace the active task records.
    async fn save_active(&self, active: &[ActiveTask]) -> Result<(), StoreError>;

    /// Append one record to the dead-letter log.
    async fn append_dead_letter(&self, entry: &DeadLetterEntry) -> Result<(), StoreError>;

    async fn load_dead_letters(&self) -> Result<Vec<DeadLetterEntry>, StoreError>;
}

/// Persistence of council rounds, state, convergence log and report
#[async_trait]
pub trait CouncilRepository: Send + Sync {
    async fn save_state(&self, state: &CouncilState) -> Result<(), StoreError>;

    /// Write one finalized round. Rounds are never rewritten.
    async fn save_round(&self, round: &CouncilRound) -> Result<(), StoreError>;

    async fn append_convergence(&self, entry: &ConvergenceEntry) -> Result<(), StoreError>;

    /// Replace the human-readable decision report.
    async fn write_report(&self, report: &str) -> Result<(), StoreError>;
}

/// Persistence of the session snapshot
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save_status(&self, status: &SessionStatus) -> Result<(), StoreError>;

    /// `None` when no run has been recorded yet.
    async fn load_status(&self) -> Result<Option<SessionStatus>, StoreError>;

    /// Remove the queue and council state of the last run. The dead-letter
    /// log and logs are kept.
    async fn clear_run_state(&self) -> Result<(), StoreError>;
}
