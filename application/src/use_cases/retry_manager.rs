//! Retry/Dead-Letter Manager
//!
//! Promotes stalled tasks through `retrying` back to `queued`, or to
//! `dead_letter` once the retry cap is reached. Backoff delays run in
//! detached tasks so the scheduler keeps dispatching other work; a task
//! waiting out its backoff stays `retrying`.
//!
//! The manager also enforces the session-wide retry budget: once more
//! retries than the budget allows have been started, every call fails with
//! [`DomainError::MaxRetriesExceeded`].

use crate::ports::progress::RunProgressNotifier;
use crate::use_cases::queue_store::{QueueError, TaskQueueStore};
use autopilot_domain::{DeadLetterEntry, DomainError, RetryDecision, RetryPolicy, TaskId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to one stalled task
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    Requeued {
        task: TaskId,
        attempt: u32,
        delay: Duration,
    },
    DeadLettered(DeadLetterEntry),
}

pub struct RetryManager {
    queue: Arc<TaskQueueStore>,
    policy: RetryPolicy,
    session_budget: u32,
    retries_started: AtomicU32,
    token: CancellationToken,
}

impl RetryManager {
    pub fn new(
        queue: Arc<TaskQueueStore>,
        policy: RetryPolicy,
        session_budget: u32,
        token: CancellationToken,
    ) -> Self {
        Self {
            queue,
            policy,
            session_budget,
            retries_started: AtomicU32::new(0),
            token,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries started so far in this session
    pub fn retries_started(&self) -> u32 {
        self.retries_started.load(Ordering::SeqCst)
    }

    /// Process every task currently `stalled`.
    pub async fn handle_stalled(
        &self,
        progress: &dyn RunProgressNotifier,
    ) -> Result<Vec<RetryOutcome>, QueueError> {
        let mut outcomes = Vec::new();
        for id in self.queue.stalled().await {
            outcomes.push(self.handle(&id, progress).await?);
        }
        Ok(outcomes)
    }

    /// `stalled → retrying`, then requeue (after backoff) or dead-letter.
    pub async fn handle(
        &self,
        id: &TaskId,
        progress: &dyn RunProgressNotifier,
    ) -> Result<RetryOutcome, QueueError> {
        let next = self.retries_started() + 1;
        if next > self.session_budget {
            return Err(DomainError::MaxRetriesExceeded {
                retries: next,
                limit: self.session_budget,
            }
            .into());
        }

        // Only a retry that actually started counts against the budget
        let count = self.queue.begin_retry(id).await?;
        self.retries_started.fetch_add(1, Ordering::SeqCst);
        match self.policy.decide(count) {
            RetryDecision::Requeue { attempt, delay } => {
                info!("Retrying task {} (attempt {}, backoff {:?})", id, attempt, delay);
                progress.on_task_retry(id, attempt, delay);
                self.schedule_requeue(id.clone(), delay).await?;
                Ok(RetryOutcome::Requeued {
                    task: id.clone(),
                    attempt,
                    delay,
                })
            }
            RetryDecision::DeadLetter { attempts } => {
                let entry = self.queue.dead_letter(id).await?;
                warn!(
                    "Task {} dead-lettered after {} retries: {}",
                    id, attempts, entry.reason
                );
                progress.on_dead_letter(&entry);
                Ok(RetryOutcome::DeadLettered(entry))
            }
        }
    }

    async fn schedule_requeue(&self, id: TaskId, delay: Duration) -> Result<(), QueueError> {
        if delay.is_zero() {
            return self.queue.requeue(&id).await;
        }
        let queue = Arc::clone(&self.queue);
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Backoff for task {} cancelled", id);
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = queue.requeue(&id).await {
                        warn!("Failed to requeue task {}: {}", id, e);
                    }
                }
            }
        });
        Ok(())
    }
}
