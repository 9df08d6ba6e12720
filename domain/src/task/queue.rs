//! In-memory task queue
//!
//! [`TaskQueue`] owns every [`Task`] of a session. It is a plain value: the
//! application layer wraps it in a single async mutex so `pick`, `complete`
//! and the stall sweep run as one critical section, and persists a snapshot
//! after each mutation.

use super::entities::{Task, TaskState};
use crate::core::error::DomainError;
use crate::core::ids::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::time::Duration;

/// Per-state task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub queued: usize,
    pub in_progress: usize,
    pub stalled: usize,
    pub retrying: usize,
    pub completed: usize,
    pub dead_letter: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending
            + self.queued
            + self.in_progress
            + self.stalled
            + self.retrying
            + self.completed
            + self.dead_letter
    }

    /// Tasks that still need processing
    pub fn outstanding(&self) -> usize {
        self.total() - self.completed - self.dead_letter
    }
}

/// Ordered collection of tasks with FIFO-within-priority picking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    fn get_mut(&mut self, id: &TaskId) -> Result<&mut Task, DomainError> {
        self.tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| DomainError::UnknownTask(id.clone()))
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Append a pending task and make it visible to pickers (`pending → queued`).
    pub fn enqueue(&mut self, mut task: Task, now: DateTime<Utc>) -> Result<TaskId, DomainError> {
        if self.position(&task.id).is_some() {
            return Err(DomainError::DuplicateTask(task.id));
        }
        task.enqueue(now)?;
        let seq = self.next_seq();
        task.set_seq(seq);
        let id = task.id.clone();
        self.tasks.push(task);
        Ok(id)
    }

    /// Select the next queued task and move it to `in_progress`.
    ///
    /// Highest priority wins; among equal priorities the lowest enqueue
    /// sequence (oldest) wins. Returns `None` when nothing is queued.
    pub fn pick(&mut self, now: DateTime<Utc>, stall_timeout: Duration) -> Option<Task> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state() == TaskState::Queued)
            .min_by_key(|(_, t)| (Reverse(t.priority), t.seq()))
            .map(|(i, _)| i)?;

        let task = &mut self.tasks[index];
        // Queued → InProgress is always valid, the filter above guarantees it
        task.start(now, stall_timeout).ok()?;
        Some(task.clone())
    }

    /// The task if `attempt` is its current in-progress attempt.
    fn held_mut(&mut self, id: &TaskId, attempt: u32) -> Result<&mut Task, DomainError> {
        let task = self.get_mut(id)?;
        if task.state() != TaskState::InProgress || task.attempt() != attempt {
            return Err(DomainError::UnknownTask(id.clone()));
        }
        Ok(task)
    }

    /// Whether `attempt` still holds `id`: the task is `in_progress` and was
    /// not reclaimed and picked again since.
    pub fn holds(&self, id: &TaskId, attempt: u32) -> bool {
        self.get(id)
            .is_some_and(|t| t.state() == TaskState::InProgress && t.attempt() == attempt)
    }

    /// `in_progress → completed`.
    ///
    /// Fails with [`DomainError::UnknownTask`] when the task does not exist,
    /// is not in progress, or is held by a later attempt than `attempt`.
    pub fn complete(
        &mut self,
        id: &TaskId,
        attempt: u32,
        now: DateTime<Utc>,
        output: Option<String>,
    ) -> Result<&Task, DomainError> {
        let task = self.held_mut(id, attempt)?;
        task.complete(now, output)?;
        Ok(task)
    }

    /// Escalated failure: `in_progress → stalled` with the failure reason.
    /// Same holder check as [`complete`](Self::complete).
    pub fn fail(
        &mut self,
        id: &TaskId,
        attempt: u32,
        now: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<&Task, DomainError> {
        let task = self.held_mut(id, attempt)?;
        task.stall(now, Some(reason.into()))?;
        Ok(task)
    }

    /// Move every overdue `in_progress` task to `stalled`.
    pub fn sweep_stalled(&mut self, now: DateTime<Utc>) -> Vec<TaskId> {
        let mut stalled = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.is_overdue(now)) {
            let reason = DomainError::StallTimeout(task.id.clone()).to_string();
            if task.stall(now, Some(reason)).is_ok() {
                stalled.push(task.id.clone());
            }
        }
        stalled
    }

    /// `stalled → retrying`; returns the new retry count.
    pub fn begin_retry(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<u32, DomainError> {
        self.get_mut(id)?.begin_retry(now)
    }

    /// `retrying → queued`, placed at the back of its priority band.
    pub fn requeue(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<(), DomainError> {
        let seq = self.next_seq + 1;
        let task = self.get_mut(id)?;
        task.requeue(now)?;
        task.set_seq(seq);
        self.next_seq = seq;
        Ok(())
    }

    /// `retrying → dead_letter`; returns a copy of the terminal record.
    pub fn dead_letter(&mut self, id: &TaskId, now: DateTime<Utc>) -> Result<Task, DomainError> {
        let task = self.get_mut(id)?;
        task.dead_letter(now)?;
        Ok(task.clone())
    }

    // ==================== Queries ====================

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queued tasks in the order `pick` would return them.
    pub fn queued(&self) -> Vec<&Task> {
        let mut queued: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.state() == TaskState::Queued)
            .collect();
        queued.sort_by_key(|t| (Reverse(t.priority), t.seq()));
        queued
    }

    pub fn in_state(&self, state: TaskState) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.state() == state)
    }

    pub fn has_queued(&self) -> bool {
        self.tasks.iter().any(|t| t.state() == TaskState::Queued)
    }

    /// True iff every task of `phase` is `completed` or `dead_letter`.
    ///
    /// A phase with no tasks is trivially resolved.
    pub fn phase_resolved(&self, phase: usize) -> bool {
        self.tasks
            .iter()
            .filter(|t| t.phase == phase)
            .all(|t| t.state().is_terminal())
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for task in &self.tasks {
            match task.state() {
                TaskState::Pending => stats.pending += 1,
                TaskState::Queued => stats.queued += 1,
                TaskState::InProgress => stats.in_progress += 1,
                TaskState::Stalled => stats.stalled += 1,
                TaskState::Retrying => stats.retrying += 1,
                TaskState::Completed => stats.completed += 1,
                TaskState::DeadLetter => stats.dead_letter += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn queue_with(ids: &[&str]) -> TaskQueue {
        let mut queue = TaskQueue::new();
        for id in ids {
            queue
                .enqueue(Task::new(format!("do {id}")).with_id(*id), at(0))
                .unwrap();
        }
        queue
    }

    #[test]
    fn test_pick_is_fifo() {
        let mut queue = queue_with(&["a", "b", "c"]);
        assert_eq!(queue.pick(at(1), TIMEOUT).unwrap().id.as_str(), "a");
        assert_eq!(queue.pick(at(1), TIMEOUT).unwrap().id.as_str(), "b");
        assert_eq!(queue.pick(at(1), TIMEOUT).unwrap().id.as_str(), "c");
        assert!(queue.pick(at(1), TIMEOUT).is_none());
    }

    #[test]
    fn test_pick_prefers_priority_then_fifo() {
        let mut queue = TaskQueue::new();
        queue.enqueue(Task::new("low").with_id("low"), at(0)).unwrap();
        queue
            .enqueue(Task::new("high1").with_id("high1").with_priority(5), at(0))
            .unwrap();
        queue
            .enqueue(Task::new("high2").with_id("high2").with_priority(5), at(0))
            .unwrap();

        let order: Vec<String> = std::iter::from_fn(|| queue.pick(at(1), TIMEOUT))
            .map(|t| t.id.to_string())
            .collect();
        assert_eq!(order, vec!["high1", "high2", "low"]);
    }

    #[test]
    fn test_picked_task_is_in_progress() {
        let mut queue = queue_with(&["a"]);
        let picked = queue.pick(at(1), TIMEOUT).unwrap();
        assert_eq!(picked.state(), TaskState::InProgress);
        assert_eq!(queue.get(&picked.id).unwrap().state(), TaskState::InProgress);
        // Not pickable twice
        assert!(queue.pick(at(1), TIMEOUT).is_none());
    }

    #[test]
    fn test_duplicate_enqueue_rejected() {
        let mut queue = queue_with(&["a"]);
        let err = queue.enqueue(Task::new("again").with_id("a"), at(0)).unwrap_err();
        assert_eq!(err, DomainError::DuplicateTask(TaskId::new("a")));
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let mut queue = queue_with(&["a"]);
        let id = TaskId::new("a");
        assert_eq!(
            queue.complete(&id, 0, at(1), None).unwrap_err(),
            DomainError::UnknownTask(id.clone())
        );
        let attempt = queue.pick(at(1), TIMEOUT).unwrap().attempt();
        assert_eq!(attempt, 1);
        queue.complete(&id, attempt, at(2), None).unwrap();
        assert_eq!(queue.get(&id).unwrap().state(), TaskState::Completed);
        // Completing twice is also an unknown task
        assert!(queue.complete(&id, attempt, at(3), None).is_err());
    }

    #[test]
    fn test_complete_unknown_task() {
        let mut queue = TaskQueue::new();
        let id = TaskId::new("ghost");
        assert_eq!(
            queue.complete(&id, 1, at(0), None).unwrap_err(),
            DomainError::UnknownTask(id)
        );
    }

    #[test]
    fn test_sweep_moves_overdue_tasks_to_stalled() {
        let mut queue = queue_with(&["a", "b"]);
        queue.pick(at(0), TIMEOUT).unwrap();
        queue.pick(at(20), TIMEOUT).unwrap();

        let stalled = queue.sweep_stalled(at(31));
        assert_eq!(stalled, vec![TaskId::new("a")]);
        assert_eq!(queue.get(&"a".into()).unwrap().state(), TaskState::Stalled);
        assert_eq!(queue.get(&"b".into()).unwrap().state(), TaskState::InProgress);
        assert!(
            queue
                .get(&"a".into())
                .unwrap()
                .last_error()
                .unwrap()
                .contains("stall timeout")
        );
    }

    #[test]
    fn test_reclaimed_attempt_cannot_report() {
        let mut queue = queue_with(&["a"]);
        let first = queue.pick(at(0), TIMEOUT).unwrap();
        assert_eq!(queue.sweep_stalled(at(31)), vec![first.id.clone()]);
        queue.begin_retry(&first.id, at(31)).unwrap();
        queue.requeue(&first.id, at(31)).unwrap();
        let second = queue.pick(at(32), TIMEOUT).unwrap();
        assert_eq!(second.attempt(), first.attempt() + 1);

        // The swept holder is stale: it can neither complete nor escalate
        assert!(!queue.holds(&first.id, first.attempt()));
        assert_eq!(
            queue.complete(&first.id, first.attempt(), at(33), None).unwrap_err(),
            DomainError::UnknownTask(first.id.clone())
        );
        assert!(queue.fail(&first.id, first.attempt(), at(33), "late").is_err());
        assert_eq!(queue.get(&first.id).unwrap().state(), TaskState::InProgress);

        // The current holder still can
        assert!(queue.holds(&second.id, second.attempt()));
        queue
            .complete(&second.id, second.attempt(), at(34), Some("ok".into()))
            .unwrap();
        assert_eq!(queue.get(&second.id).unwrap().state(), TaskState::Completed);
    }

    #[test]
    fn test_requeue_goes_to_back_of_band() {
        let mut queue = queue_with(&["a", "b"]);
        let a = queue.pick(at(0), TIMEOUT).unwrap().id;
        queue.fail(&a, 1, at(1), "boom").unwrap();
        queue.begin_retry(&a, at(1)).unwrap();
        queue.requeue(&a, at(2)).unwrap();

        let order: Vec<String> = queue.queued().iter().map(|t| t.id.to_string()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_phase_resolved_counts_dead_letters() {
        let mut queue = TaskQueue::new();
        queue
            .enqueue(Task::new("x").with_id("x").with_phase(0), at(0))
            .unwrap();
        queue
            .enqueue(Task::new("y").with_id("y").with_phase(0), at(0))
            .unwrap();
        assert!(!queue.phase_resolved(0));
        assert!(queue.phase_resolved(1));

        let x = queue.pick(at(0), TIMEOUT).unwrap().id;
        queue.complete(&x, 1, at(1), None).unwrap();
        let y = queue.pick(at(1), TIMEOUT).unwrap().id;
        queue.fail(&y, 1, at(2), "fatal").unwrap();
        queue.begin_retry(&y, at(2)).unwrap();
        queue.dead_letter(&y, at(2)).unwrap();

        assert!(queue.phase_resolved(0));
        let stats = queue.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.dead_letter, 1);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_queue_snapshot_roundtrip_preserves_order() {
        let mut queue = queue_with(&["a", "b"]);
        queue.pick(at(1), TIMEOUT).unwrap();
        let json = serde_json::to_string(&queue).unwrap();
        let mut restored: TaskQueue = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, queue);
        assert_eq!(restored.pick(at(2), TIMEOUT).unwrap().id.as_str(), "b");
    }
}
