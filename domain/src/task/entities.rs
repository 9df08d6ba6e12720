//! Task entity and its lifecycle state machine

use crate::agent::AgentRole;
use crate::core::error::DomainError;
use crate::core::ids::TaskId;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle state of a task
///
/// ```text
/// pending → queued → in_progress → completed
///             ↑           │
///             │        stalled
///             │           │
///             └─────── retrying ──→ dead_letter
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, not yet visible to pickers
    #[default]
    Pending,
    /// Waiting in the queue
    Queued,
    /// Picked by an agent
    InProgress,
    /// Exceeded its stall deadline or was escalated by its agent
    Stalled,
    /// Retry accounted, waiting for backoff before re-queueing
    Retrying,
    /// Finished successfully
    Completed,
    /// Retry budget exhausted; no further automatic processing
    DeadLetter,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Queued => "queued",
            TaskState::InProgress => "in_progress",
            TaskState::Stalled => "stalled",
            TaskState::Retrying => "retrying",
            TaskState::Completed => "completed",
            TaskState::DeadLetter => "dead_letter",
        }
    }

    /// Terminal states never leave; they also count as resolved for phase
    /// advancement.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::DeadLetter)
    }

    /// Whether `self → next` is one of the defined transitions.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Queued)
                | (Queued, InProgress)
                | (InProgress, Completed)
                | (InProgress, Stalled)
                | (Stalled, Retrying)
                | (Retrying, Queued)
                | (Retrying, DeadLetter)
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work owned by the task queue.
///
/// State, retry count and timestamps are private: they change only through
/// the transition methods below, each of which validates the move against
/// [`TaskState::can_transition_to`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// What the agent should do
    pub description: String,
    /// Index of the SDLC phase this task belongs to
    pub phase: usize,
    /// Higher runs first; FIFO among equal priorities
    pub priority: i32,
    /// Agent tier that should process the task
    pub role: AgentRole,
    state: TaskState,
    retry_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    stall_deadline: Option<DateTime<Utc>>,
    last_error: Option<String>,
    output: Option<String>,
    seq: u64,
    #[serde(default)]
    attempt: u32,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            description: description.into(),
            phase: 0,
            priority: 0,
            role: AgentRole::default(),
            state: TaskState::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            stall_deadline: None,
            last_error: None,
            output: None,
            seq: 0,
            attempt: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_phase(mut self, phase: usize) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.role = role;
        self
    }

    // ==================== Accessors ====================

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last state transition
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn stall_deadline(&self) -> Option<DateTime<Utc>> {
        self.stall_deadline
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Enqueue sequence number (FIFO tie-break)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Number of times the task was picked. Identifies the current holder:
    /// an agent may only report the attempt it was handed.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// An `in_progress` task whose stall deadline has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state == TaskState::InProgress
            && self.stall_deadline.is_some_and(|deadline| now > deadline)
    }

    // ==================== Transitions ====================

    fn transition(&mut self, next: TaskState, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::transition("task", self.state, next));
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// `pending → queued`
    pub fn enqueue(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(TaskState::Queued, now)
    }

    /// `queued → in_progress`, arming the stall deadline and starting a new
    /// attempt.
    pub fn start(&mut self, now: DateTime<Utc>, stall_timeout: Duration) -> Result<(), DomainError> {
        self.transition(TaskState::InProgress, now)?;
        self.attempt += 1;
        self.stall_deadline = TimeDelta::from_std(stall_timeout)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta));
        Ok(())
    }

    /// `in_progress → completed`
    pub fn complete(&mut self, now: DateTime<Utc>, output: Option<String>) -> Result<(), DomainError> {
        self.transition(TaskState::Completed, now)?;
        self.stall_deadline = None;
        self.output = output;
        Ok(())
    }

    /// `in_progress → stalled`
    pub fn stall(&mut self, now: DateTime<Utc>, reason: Option<String>) -> Result<(), DomainError> {
        self.transition(TaskState::Stalled, now)?;
        self.stall_deadline = None;
        if reason.is_some() {
            self.last_error = reason;
        }
        Ok(())
    }

    /// `stalled → retrying`; returns the incremented retry count.
    pub fn begin_retry(&mut self, now: DateTime<Utc>) -> Result<u32, DomainError> {
        self.transition(TaskState::Retrying, now)?;
        self.retry_count += 1;
        Ok(self.retry_count)
    }

    /// `retrying → queued`
    pub fn requeue(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(TaskState::Queued, now)
    }

    /// `retrying → dead_letter`
    pub fn dead_letter(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(TaskState::DeadLetter, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("write tests");
        assert_eq!(task.state(), TaskState::Pending);
        assert_eq!(task.retry_count(), 0);
        assert!(task.stall_deadline().is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut task = Task::new("build");
        task.enqueue(at(0)).unwrap();
        task.start(at(1), Duration::from_secs(60)).unwrap();
        assert_eq!(task.stall_deadline(), Some(at(61)));
        task.complete(at(2), Some("ok".into())).unwrap();
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.updated_at(), at(2));
        assert_eq!(task.output(), Some("ok"));
        assert!(task.stall_deadline().is_none());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut task = Task::new("build");
        let err = task.complete(at(0), None).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "task",
                from: "pending".into(),
                to: "completed".into()
            }
        );
        assert_eq!(task.state(), TaskState::Pending);
    }

    #[test]
    fn test_retry_increments_count() {
        let mut task = Task::new("flaky");
        task.enqueue(at(0)).unwrap();
        task.start(at(0), Duration::from_secs(1)).unwrap();
        task.stall(at(5), Some("timeout".into())).unwrap();
        assert_eq!(task.begin_retry(at(5)).unwrap(), 1);
        task.requeue(at(6)).unwrap();
        assert_eq!(task.state(), TaskState::Queued);
        assert_eq!(task.last_error(), Some("timeout"));
    }

    #[test]
    fn test_is_overdue() {
        let mut task = Task::new("slow");
        task.enqueue(at(0)).unwrap();
        assert!(!task.is_overdue(at(100)));
        task.start(at(0), Duration::from_secs(10)).unwrap();
        assert!(!task.is_overdue(at(10)));
        assert!(task.is_overdue(at(11)));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for next in [
            TaskState::Pending,
            TaskState::Queued,
            TaskState::InProgress,
            TaskState::Stalled,
            TaskState::Retrying,
        ] {
            assert!(!TaskState::Completed.can_transition_to(next));
            assert!(!TaskState::DeadLetter.can_transition_to(next));
        }
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskState::DeadLetter).unwrap(),
            "\"dead_letter\""
        );
        assert_eq!(
            serde_json::to_string(&TaskState::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
