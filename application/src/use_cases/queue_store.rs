//! Task Queue Store
//!
//! Owns the run's [`TaskQueue`] behind one async mutex: `pick`, `complete`,
//! the stall sweep and the retry transitions are serialized, so a task is
//! handed to at most one picker. Every mutation persists the queue snapshot
//! through the [`QueueRepository`] port before the lock is released.

use crate::ports::event_logger::{EventLogger, NoEventLogger, RunEvent};
use crate::ports::state_store::{ActiveTask, QueueRepository, StoreError};
use autopilot_domain::{
    DeadLetterEntry, DomainError, QueueStats, SessionContext, Task, TaskId, TaskQueue, TaskState,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors from queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            QueueError::Domain(e) => Some(e),
            QueueError::Store(_) => None,
        }
    }
}

pub struct TaskQueueStore {
    queue: Mutex<TaskQueue>,
    repository: Arc<dyn QueueRepository>,
    stall_timeout: Duration,
    context: SessionContext,
    events: Arc<dyn EventLogger>,
}

impl TaskQueueStore {
    pub fn new(
        repository: Arc<dyn QueueRepository>,
        stall_timeout: Duration,
        context: SessionContext,
    ) -> Self {
        Self {
            queue: Mutex::new(TaskQueue::new()),
            repository,
            stall_timeout,
            context,
            events: Arc::new(NoEventLogger),
        }
    }

    pub fn with_event_logger(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = events;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    async fn persist(&self, queue: &TaskQueue) -> Result<(), StoreError> {
        self.repository.save_queue(queue).await
    }

    /// Append `task` as `queued`. FIFO among equal priorities.
    pub async fn enqueue(&self, task: Task) -> Result<TaskId, QueueError> {
        let mut queue = self.queue.lock().await;
        let id = queue.enqueue(task, Utc::now())?;
        self.persist(&queue).await?;
        debug!("Enqueued task {}", id);
        Ok(id)
    }

    /// Enqueue a batch with a single persistence write.
    pub async fn enqueue_all(&self, tasks: Vec<Task>) -> Result<Vec<TaskId>, QueueError> {
        let mut queue = self.queue.lock().await;
        let now = Utc::now();
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            ids.push(queue.enqueue(task, now)?);
        }
        self.persist(&queue).await?;
        debug!("Enqueued {} tasks", ids.len());
        Ok(ids)
    }

    /// Take the next queued task (highest priority, oldest first), moving it
    /// to `in_progress` with a fresh stall deadline. `None` when nothing is
    /// queued.
    pub async fn pick(&self) -> Result<Option<Task>, QueueError> {
        let mut queue = self.queue.lock().await;
        let Some(task) = queue.pick(Utc::now(), self.stall_timeout) else {
            return Ok(None);
        };
        self.persist(&queue).await?;
        debug!("Picked task {}", task.id);
        Ok(Some(task))
    }

    /// `in_progress → completed` for the holder of `attempt`. Fails with
    /// `UnknownTask` when the task is absent, no longer in progress, or was
    /// swept and picked again by another agent.
    pub async fn complete(
        &self,
        id: &TaskId,
        attempt: u32,
        output: Option<String>,
    ) -> Result<Task, QueueError> {
        let mut queue = self.queue.lock().await;
        let task = queue.complete(id, attempt, Utc::now(), output)?.clone();
        self.persist(&queue).await?;
        self.events.log(RunEvent::new(
            "task_completed",
            json!({
                "session_id": self.context.session_id,
                "task_id": task.id,
                "phase": task.phase,
                "retry_count": task.retry_count(),
            }),
        ));
        Ok(task)
    }

    /// `in_progress → stalled` on agent escalation, for the holder of `attempt`.
    pub async fn fail(
        &self,
        id: &TaskId,
        attempt: u32,
        reason: impl Into<String>,
    ) -> Result<Task, QueueError> {
        let reason = reason.into();
        let mut queue = self.queue.lock().await;
        let task = queue.fail(id, attempt, Utc::now(), reason.clone())?.clone();
        self.persist(&queue).await?;
        self.events.log(RunEvent::new(
            "task_failed",
            json!({
                "session_id": self.context.session_id,
                "task_id": task.id,
                "reason": reason,
            }),
        ));
        Ok(task)
    }

    /// Move overdue `in_progress` tasks to `stalled`.
    pub async fn sweep(&self) -> Result<Vec<TaskId>, QueueError> {
        let mut queue = self.queue.lock().await;
        let stalled = queue.sweep_stalled(Utc::now());
        if stalled.is_empty() {
            return Ok(stalled);
        }
        self.persist(&queue).await?;
        for id in &stalled {
            let err = DomainError::StallTimeout(id.clone());
            warn!("{}", err);
            self.events.log(RunEvent::new(
                "task_stalled",
                json!({ "session_id": self.context.session_id, "task_id": id }),
            ));
        }
        Ok(stalled)
    }

    /// Run [`sweep`](Self::sweep) every `interval` until `token` is cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match store.sweep().await {
                            Ok(ids) if !ids.is_empty() => {
                                info!("Sweeper stalled {} task(s)", ids.len());
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Stall sweep failed: {}", e),
                        }
                    }
                }
            }
            debug!("Sweeper stopped");
        })
    }

    // ==================== Retry path ====================

    /// `stalled → retrying`; returns the incremented retry count.
    pub async fn begin_retry(&self, id: &TaskId) -> Result<u32, QueueError> {
        let mut queue = self.queue.lock().await;
        let count = queue.begin_retry(id, Utc::now())?;
        self.persist(&queue).await?;
        Ok(count)
    }

    /// `retrying → queued`, at the back of its priority band.
    pub async fn requeue(&self, id: &TaskId) -> Result<(), QueueError> {
        let mut queue = self.queue.lock().await;
        queue.requeue(id, Utc::now())?;
        self.persist(&queue).await?;
        Ok(())
    }

    /// `retrying → dead_letter`, appending the task to the dead-letter log.
    pub async fn dead_letter(&self, id: &TaskId) -> Result<DeadLetterEntry, QueueError> {
        let mut queue = self.queue.lock().await;
        let now = Utc::now();
        let task = queue.dead_letter(id, now)?;
        let entry = DeadLetterEntry::new(self.context.session_id.clone(), task, now);
        self.persist(&queue).await?;
        self.repository.append_dead_letter(&entry).await?;
        self.events.log(RunEvent::new(
            "task_dead_lettered",
            json!({
                "session_id": self.context.session_id,
                "task_id": entry.task.id,
                "retry_count": entry.task.retry_count(),
                "reason": entry.reason,
            }),
        ));
        Ok(entry)
    }

    /// Replace the active-task records.
    pub async fn record_active(&self, active: &[ActiveTask]) -> Result<(), QueueError> {
        // Serialized with the queue snapshot so both files describe the same moment
        let _queue = self.queue.lock().await;
        self.repository.save_active(active).await?;
        Ok(())
    }

    // ==================== Queries ====================

    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.queue.lock().await.get(id).cloned()
    }

    /// Whether the agent handed `task` still holds it.
    pub async fn holds(&self, task: &Task) -> bool {
        self.queue.lock().await.holds(&task.id, task.attempt())
    }

    pub async fn stalled(&self) -> Vec<TaskId> {
        self.queue
            .lock()
            .await
            .in_state(TaskState::Stalled)
            .map(|t| t.id.clone())
            .collect()
    }

    pub async fn has_queued(&self) -> bool {
        self.queue.lock().await.has_queued()
    }

    pub async fn phase_resolved(&self, phase: usize) -> bool {
        self.queue.lock().await.phase_resolved(phase)
    }

    pub async fn stats(&self) -> QueueStats {
        self.queue.lock().await.stats()
    }

    pub async fn snapshot(&self) -> TaskQueue {
        self.queue.lock().await.clone()
    }
}
