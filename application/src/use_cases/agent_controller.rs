//! Agent Lifecycle Controller
//!
//! Spawns single-use agents, binds each to one task by identifier, and runs
//! the RARV worker loop for it:
//!
//! ```text
//! Request ─► Act (provider CLI) ─► Review ─► Verify ──done──► report ─► terminated
//!                 ▲                              │
//!                 └── retrying ◄── error ◄───────┘ (transient, up to max_internal_retries)
//!                                  │
//!                                  └──(exhausted / fatal)──► escalate to queue ─► terminated
//! ```
//!
//! Busy agents are bounded by the provider's effective concurrency;
//! [`AgentController::assign`] refuses work beyond it.
//!
//! An agent holds exactly one attempt of its task. When the stall sweep
//! reclaims the task the agent is `Lost`: it stops before its next step,
//! abandons an in-flight provider call, and cannot report the attempt.

use crate::config::ExecutionParams;
use crate::ports::event_logger::{EventLogger, NoEventLogger, RunEvent};
use crate::ports::progress::{NoProgress, RunProgressNotifier};
use crate::ports::state_store::ActiveTask;
use crate::ports::task_executor::{ExecutionError, TaskExecutor};
use crate::use_cases::queue_store::{QueueError, TaskQueueStore};
use autopilot_domain::agent::rarv::{self, RarvStep, Verification};
use autopilot_domain::{Agent, AgentId, AgentRole, AgentState, DomainError, Task, TaskId};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a worker finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Task reported `completed`
    Completed,
    /// Agent gave up; the task is `stalled` and goes through the retry path
    Escalated(String),
    /// Stop was requested before the next RARV step
    Cancelled,
    /// The attempt was no longer ours (swept as stalled while the agent worked)
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub agent_id: AgentId,
    pub task_id: TaskId,
    pub outcome: WorkerOutcome,
    /// Provider invocations made by this agent
    pub attempts: u32,
}

#[derive(Default)]
struct Registry {
    agents: HashMap<AgentId, Agent>,
    active: HashMap<AgentId, ActiveTask>,
}

impl Registry {
    fn busy(&self) -> usize {
        self.agents.values().filter(|a| a.state().is_busy()).count()
    }

    fn get_mut(&mut self, id: &AgentId) -> Result<&mut Agent, DomainError> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| DomainError::UnknownAgent(id.clone()))
    }

    fn active_tasks(&self) -> Vec<ActiveTask> {
        let mut active: Vec<_> = self.active.values().cloned().collect();
        active.sort_by_key(|a| a.started_at);
        active
    }
}

pub struct AgentController {
    registry: Mutex<Registry>,
    capacity: usize,
    max_internal_retries: u32,
    task_timeout: Duration,
    reclaim_check: Duration,
    executor: Arc<dyn TaskExecutor>,
    queue: Arc<TaskQueueStore>,
    progress: Arc<dyn RunProgressNotifier>,
    events: Arc<dyn EventLogger>,
}

impl AgentController {
    pub fn new(
        executor: Arc<dyn TaskExecutor>,
        queue: Arc<TaskQueueStore>,
        capacity: usize,
        params: &ExecutionParams,
    ) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            capacity: capacity.max(1),
            max_internal_retries: params.max_internal_retries,
            task_timeout: params.task_timeout,
            reclaim_check: params.sweep_interval.max(Duration::from_millis(10)),
            executor,
            queue,
            progress: Arc::new(NoProgress),
            events: Arc::new(NoEventLogger),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn RunProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_event_logger(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = events;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Agents currently holding a task
    pub async fn active_count(&self) -> usize {
        self.registry.lock().await.busy()
    }

    pub async fn has_capacity(&self) -> bool {
        self.active_count().await < self.capacity
    }

    pub async fn agents(&self) -> Vec<Agent> {
        self.registry.lock().await.agents.values().cloned().collect()
    }

    // ==================== Lifecycle ====================

    /// `spawn → ready`
    pub async fn spawn(&self, role: AgentRole) -> AgentId {
        let now = Utc::now();
        let mut agent = Agent::spawn(role, now);
        if let Err(e) = agent.mark_ready(now) {
            // A freshly spawned agent is always allowed to become ready
            warn!("Agent {} could not become ready: {}", agent.id, e);
        }
        let id = agent.id.clone();
        self.registry.lock().await.agents.insert(id.clone(), agent);
        debug!("Spawned {} agent {}", role, id);
        id
    }

    /// `ready → working`, binding `task`.
    ///
    /// Fails with `UnknownAgent`, `AgentBusy` when the agent is not `ready`,
    /// or `CapacityExceeded` when the concurrency bound is reached.
    pub async fn assign(&self, agent_id: &AgentId, task: &Task) -> Result<(), DomainError> {
        let mut registry = self.registry.lock().await;
        let busy = registry.busy();
        let agent = registry.get_mut(agent_id)?;
        if agent.state() != AgentState::Ready {
            return Err(DomainError::AgentBusy {
                agent: agent_id.clone(),
                state: agent.state().to_string(),
            });
        }
        if busy >= self.capacity {
            return Err(DomainError::CapacityExceeded {
                limit: self.capacity,
            });
        }
        let now = Utc::now();
        agent.assign(task.id.clone(), now)?;
        registry.active.insert(
            agent_id.clone(),
            ActiveTask {
                task_id: task.id.clone(),
                agent_id: agent_id.clone(),
                description: task.description.clone(),
                started_at: now,
            },
        );
        Ok(())
    }

    /// Any state → `terminated`, removing the agent from the registry.
    pub async fn terminate(&self, agent_id: &AgentId) -> Option<Agent> {
        let mut registry = self.registry.lock().await;
        registry.active.remove(agent_id);
        let mut agent = registry.agents.remove(agent_id)?;
        agent.terminate(Utc::now());
        Some(agent)
    }

    /// Spawn an agent for `task` and bind it. The agent is terminated again
    /// when the binding fails.
    pub async fn start(&self, task: &Task) -> Result<AgentId, QueueError> {
        let agent_id = self.spawn(task.role).await;
        if let Err(e) = self.assign(&agent_id, task).await {
            self.terminate(&agent_id).await;
            return Err(e.into());
        }
        self.sync_active().await?;
        info!("Agent {} working on task {}", agent_id, task.id);
        self.progress.on_task_started(task, &agent_id);
        self.events.log(RunEvent::new(
            "task_started",
            json!({
                "session_id": self.queue.context().session_id,
                "task_id": task.id,
                "agent_id": agent_id,
                "role": task.role,
                "retry_count": task.retry_count(),
            }),
        ));
        Ok(agent_id)
    }

    async fn sync_active(&self) -> Result<(), QueueError> {
        let active = self.registry.lock().await.active_tasks();
        self.queue.record_active(&active).await
    }

    async fn with_agent<T>(
        &self,
        agent_id: &AgentId,
        f: impl FnOnce(&mut Agent) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut registry = self.registry.lock().await;
        f(registry.get_mut(agent_id)?)
    }

    // ==================== Worker loop ====================

    /// Run the RARV loop for a started agent until the task is reported,
    /// escalated, lost, or stop is requested.
    ///
    /// Store failures are returned; every other failure is folded into the
    /// report. The agent is terminated in every case.
    pub async fn run(
        self: Arc<Self>,
        agent_id: AgentId,
        task: Task,
        phase_name: Option<String>,
        token: CancellationToken,
    ) -> Result<WorkerReport, QueueError> {
        let result = self.rarv(&agent_id, &task, phase_name.as_deref(), &token).await;
        self.terminate(&agent_id).await;
        if let Err(e) = self.sync_active().await {
            warn!("Failed to record active tasks: {}", e);
        }
        let (outcome, attempts) = result?;
        debug!(
            "Agent {} finished task {}: {:?} after {} attempt(s)",
            agent_id, task.id, outcome, attempts
        );
        Ok(WorkerReport {
            agent_id,
            task_id: task.id,
            outcome,
            attempts,
        })
    }

    async fn rarv(
        &self,
        agent_id: &AgentId,
        task: &Task,
        phase_name: Option<&str>,
        token: &CancellationToken,
    ) -> Result<(WorkerOutcome, u32), QueueError> {
        let mut attempts = 0u32;
        loop {
            // Request
            if cancelled(token, agent_id, RarvStep::Request) {
                return Ok((WorkerOutcome::Cancelled, attempts));
            }
            if !self.queue.holds(task).await {
                warn!("Task {} was reclaimed from agent {}", task.id, agent_id);
                return Ok((WorkerOutcome::Lost, attempts));
            }
            let prompt = rarv::task_prompt(task, phase_name, task.retry_count() + attempts);

            // Act
            if cancelled(token, agent_id, RarvStep::Act) {
                return Ok((WorkerOutcome::Cancelled, attempts));
            }
            attempts += 1;
            let act = tokio::time::timeout(self.task_timeout, self.executor.execute(task, &prompt));
            let result = tokio::select! {
                result = act => match result {
                    Ok(result) => result,
                    Err(_) => Err(ExecutionError::Timeout(self.task_timeout.as_secs())),
                },
                _ = self.reclaimed(task) => {
                    warn!(
                        "Task {} was reclaimed while agent {} was acting; abandoning the call",
                        task.id, agent_id
                    );
                    return Ok((WorkerOutcome::Lost, attempts));
                }
            };

            // Review, Verify
            let verification = match result {
                Ok(output) => rarv::verify(&output),
                Err(e) if e.is_transient() => Verification::Retry(e.to_string()),
                Err(e) => Verification::Blocked(e.to_string()),
            };

            match verification {
                Verification::Done(output) => {
                    self.with_agent(agent_id, |a| a.report(Utc::now())).await?;
                    return match self
                        .queue
                        .complete(&task.id, task.attempt(), Some(output))
                        .await
                    {
                        Ok(completed) => {
                            info!("Task {} completed by agent {}", task.id, agent_id);
                            self.progress.on_task_completed(&completed);
                            Ok((WorkerOutcome::Completed, attempts))
                        }
                        Err(QueueError::Domain(DomainError::UnknownTask(_))) => {
                            warn!("Task {} was reclaimed before agent {} reported", task.id, agent_id);
                            Ok((WorkerOutcome::Lost, attempts))
                        }
                        Err(e) => Err(e),
                    };
                }
                Verification::Retry(reason) => {
                    let retries = self
                        .with_agent(agent_id, |a| {
                            a.fail(reason.clone(), Utc::now())?;
                            Ok(a.internal_retries())
                        })
                        .await?;
                    if retries < self.max_internal_retries {
                        warn!(
                            "Agent {} attempt {} on task {} failed: {}",
                            agent_id, attempts, task.id, reason
                        );
                        self.with_agent(agent_id, |a| {
                            a.retry(Utc::now())?;
                            a.resume_work(Utc::now())
                        })
                        .await?;
                        continue;
                    }
                    return self.escalate(agent_id, task, reason, attempts).await;
                }
                Verification::Blocked(reason) => {
                    self.with_agent(agent_id, |a| a.fail(reason.clone(), Utc::now()))
                        .await?;
                    return self.escalate(agent_id, task, reason, attempts).await;
                }
            }
        }
    }

    /// Resolves once the queue no longer lets this attempt hold `task`.
    async fn reclaimed(&self, task: &Task) {
        loop {
            tokio::time::sleep(self.reclaim_check).await;
            if !self.queue.holds(task).await {
                return;
            }
        }
    }

    async fn escalate(
        &self,
        agent_id: &AgentId,
        task: &Task,
        reason: String,
        attempts: u32,
    ) -> Result<(WorkerOutcome, u32), QueueError> {
        warn!(
            "Agent {} escalates task {} after {} attempt(s): {}",
            agent_id, task.id, attempts, reason
        );
        match self.queue.fail(&task.id, task.attempt(), reason.clone()).await {
            Ok(_) => {
                self.progress.on_task_failed(&task.id, &reason);
                Ok((WorkerOutcome::Escalated(reason), attempts))
            }
            Err(QueueError::Domain(DomainError::UnknownTask(_))) => Ok((WorkerOutcome::Lost, attempts)),
            Err(e) => Err(e),
        }
    }
}

fn cancelled(token: &CancellationToken, agent_id: &AgentId, step: RarvStep) -> bool {
    if token.is_cancelled() {
        debug!("Agent {} stopping before {}", agent_id, step);
        return true;
    }
    false
}
