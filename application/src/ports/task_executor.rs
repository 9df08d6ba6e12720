//! Task executor port
//!
//! Defines the interface for handing one task attempt to a provider CLI.

use async_trait::async_trait;
use autopilot_domain::Task;
use thiserror::Error;

/// Errors that can occur while executing a task attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Worth another attempt (non-zero exit, crash, provider hiccup)
    #[error("Transient execution error: {0}")]
    Transient(String),

    /// Retrying in this agent will not help (binary missing, bad arguments)
    #[error("Fatal execution error: {0}")]
    Fatal(String),

    #[error("Execution timed out after {0}s")]
    Timeout(u64),
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ExecutionError::Fatal(_))
    }
}

/// Port for executing task attempts
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one attempt of `task` with the given prompt and return the
    /// provider's output.
    async fn execute(&self, task: &Task, prompt: &str) -> Result<String, ExecutionError>;
}
