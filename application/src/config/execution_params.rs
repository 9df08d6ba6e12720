//! Execution parameters: worker and scheduler loop control.
//!
//! [`ExecutionParams`] groups the static timing and limit parameters used by
//! the queue store, the agent controller and the session runner. These are
//! application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution loop control parameters.
///
/// | Field | Used by |
/// |-------|---------|
/// | `stall_timeout`, `sweep_interval` | `TaskQueueStore` |
/// | `max_internal_retries`, `task_timeout` | `AgentController` |
/// | `max_iterations`, `session_max_retries`, `poll_interval` | `SessionRunner` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// How long a task may stay `in_progress` before it is swept to `stalled`.
    pub stall_timeout: Duration,
    /// How often the background sweeper looks for stalled tasks.
    pub sweep_interval: Duration,
    /// Retries an agent makes internally before escalating a task.
    pub max_internal_retries: u32,
    /// Timeout for a single provider invocation. An agent's whole run,
    /// `task_timeout × (max_internal_retries + 1)`, must end before
    /// `stall_timeout` or the sweeper hands the task to a second agent.
    pub task_timeout: Duration,
    /// Iterations after which the session fails.
    pub max_iterations: u64,
    /// Cumulative retry budget of the session.
    pub session_max_retries: u32,
    /// Scheduler tick while waiting for workers or while paused.
    pub poll_interval: Duration,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(1800),
            sweep_interval: Duration::from_secs(30),
            max_internal_retries: 2,
            task_timeout: Duration::from_secs(540),
            max_iterations: 1000,
            session_max_retries: 50,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl ExecutionParams {
    /// Longest time one agent can hold a task before escalating.
    pub fn max_agent_time(&self) -> Duration {
        self.task_timeout
            .saturating_mul(self.max_internal_retries.saturating_add(1))
    }

    /// Whether an agent can still be working when its task is swept.
    pub fn agent_outlives_stall(&self) -> bool {
        self.max_agent_time() >= self.stall_timeout
    }

    // ==================== Builder Methods ====================

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_internal_retries(mut self, max: u32) -> Self {
        self.max_internal_retries = max;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_session_max_retries(mut self, max: u32) -> Self {
        self.session_max_retries = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExecutionParams::default();
        assert_eq!(params.max_internal_retries, 2);
        assert_eq!(params.max_iterations, 1000);
        assert_eq!(params.session_max_retries, 50);
        assert!(!params.agent_outlives_stall());
    }

    #[test]
    fn test_agent_time_covers_internal_retries() {
        let params = ExecutionParams::default()
            .with_task_timeout(Duration::from_secs(1500))
            .with_max_internal_retries(2);
        assert_eq!(params.max_agent_time(), Duration::from_secs(4500));
        assert!(params.agent_outlives_stall());
        assert!(
            !params
                .with_stall_timeout(Duration::from_secs(4501))
                .agent_outlives_stall()
        );
    }

    #[test]
    fn test_builder() {
        let params = ExecutionParams::default()
            .with_max_iterations(10)
            .with_stall_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(10));

        assert_eq!(params.max_iterations, 10);
        assert_eq!(params.stall_timeout, Duration::from_secs(5));
        assert_eq!(params.poll_interval, Duration::from_millis(10));
    }
}
