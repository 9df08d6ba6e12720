//! Dead-letter records

use crate::core::ids::SessionId;
use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task that exhausted its retry budget, as written to the dead-letter log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub session_id: SessionId,
    pub task: Task,
    /// Last failure observed before the budget ran out
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    pub fn new(session_id: SessionId, task: Task, dead_lettered_at: DateTime<Utc>) -> Self {
        let reason = task
            .last_error()
            .map(str::to_string)
            .unwrap_or_else(|| format!("retry budget exhausted after {} attempts", task.retry_count()));
        Self {
            session_id,
            task,
            reason,
            dead_lettered_at,
        }
    }

    /// One-line summary for reports
    pub fn summary(&self) -> String {
        format!(
            "{} (phase {}, {} retries): {}",
            self.task.id,
            self.task.phase,
            self.task.retry_count(),
            self.reason
        )
    }
}
