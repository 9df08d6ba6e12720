//! In-memory port doubles shared by the use case tests

use crate::ports::control::{ControlSignal, ControlSink};
use crate::ports::council_member::{CouncilMember, DevilsAdvocate, MemberError};
use crate::ports::state_store::{
    ActiveTask, CouncilRepository, QueueRepository, SessionRepository, StoreError,
};
use crate::ports::task_executor::{ExecutionError, TaskExecutor};
use async_trait::async_trait;
use autopilot_domain::{
    ConvergenceEntry, CouncilRound, CouncilState, DeadLetterEntry, SessionStatus, Task, TaskId,
    TaskQueue,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ==================== Repositories ====================

#[derive(Default)]
pub struct MemoryQueueRepository {
    queues: Mutex<Vec<TaskQueue>>,
    active: Mutex<Vec<ActiveTask>>,
    dead_letters: Mutex<Vec<DeadLetterEntry>>,
}

impl MemoryQueueRepository {
    pub fn saves(&self) -> usize {
        self.queues.lock().unwrap().len()
    }

    pub fn last_queue(&self) -> Option<TaskQueue> {
        self.queues.lock().unwrap().last().cloned()
    }

    pub fn active(&self) -> Vec<ActiveTask> {
        self.active.lock().unwrap().clone()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.dead_letters.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueRepository for MemoryQueueRepository {
    async fn save_queue(&self, queue: &TaskQueue) -> Result<(), StoreError> {
        self.queues.lock().unwrap().push(queue.clone());
        Ok(())
    }

    async fn save_active(&self, active: &[ActiveTask]) -> Result<(), StoreError> {
        *self.active.lock().unwrap() = active.to_vec();
        Ok(())
    }

    async fn append_dead_letter(&self, entry: &DeadLetterEntry) -> Result<(), StoreError> {
        self.dead_letters.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn load_dead_letters(&self) -> Result<Vec<DeadLetterEntry>, StoreError> {
        Ok(self.dead_letters())
    }
}

#[derive(Default)]
pub struct MemoryCouncilRepository {
    pub state: Mutex<Option<CouncilState>>,
    pub rounds: Mutex<Vec<CouncilRound>>,
    pub convergence: Mutex<Vec<ConvergenceEntry>>,
    pub report: Mutex<String>,
}

impl MemoryCouncilRepository {
    pub fn rounds(&self) -> Vec<CouncilRound> {
        self.rounds.lock().unwrap().clone()
    }
}

#[async_trait]
impl CouncilRepository for MemoryCouncilRepository {
    async fn save_state(&self, state: &CouncilState) -> Result<(), StoreError> {
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    async fn save_round(&self, round: &CouncilRound) -> Result<(), StoreError> {
        self.rounds.lock().unwrap().push(round.clone());
        Ok(())
    }

    async fn append_convergence(&self, entry: &ConvergenceEntry) -> Result<(), StoreError> {
        self.convergence.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn write_report(&self, report: &str) -> Result<(), StoreError> {
        *self.report.lock().unwrap() = report.to_string();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionRepository {
    pub statuses: Mutex<Vec<SessionStatus>>,
    pub cleared: Mutex<usize>,
}

impl MemorySessionRepository {
    pub fn last(&self) -> Option<SessionStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn save_status(&self, status: &SessionStatus) -> Result<(), StoreError> {
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }

    async fn load_status(&self) -> Result<Option<SessionStatus>, StoreError> {
        Ok(self.last())
    }

    async fn clear_run_state(&self) -> Result<(), StoreError> {
        *self.cleared.lock().unwrap() += 1;
        Ok(())
    }
}

// ==================== Executor ====================

/// Replays scripted results per task id; unscripted tasks succeed.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<TaskId, VecDeque<Result<String, ExecutionError>>>>,
    calls: Mutex<Vec<TaskId>>,
    delay: Option<Duration>,
}

impl ScriptedExecutor {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn script(
        self,
        id: impl Into<TaskId>,
        results: Vec<Result<String, ExecutionError>>,
    ) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.into(), results.into());
        self
    }

    pub fn calls(&self, id: &TaskId) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, task: &Task, _prompt: &str) -> Result<String, ExecutionError> {
        self.calls.lock().unwrap().push(task.id.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&task.id)
            .and_then(|q| q.pop_front());
        next.unwrap_or_else(|| Ok(format!("finished {}\nSTATUS: DONE", task.description)))
    }
}

// ==================== Council ====================

pub struct FixedMember {
    pub name: String,
    pub answer: Result<String, MemberError>,
    pub delay: Option<Duration>,
}

impl FixedMember {
    pub fn yes(name: &str) -> Self {
        Self::answer(name, Ok("Everything is implemented.\nVOTE: COMPLETE".into()))
    }

    pub fn no(name: &str) -> Self {
        Self::answer(name, Ok("Tests are failing.\nVOTE: CONTINUE".into()))
    }

    pub fn answer(name: &str, answer: Result<String, MemberError>) -> Self {
        Self {
            name: name.to_string(),
            answer,
            delay: None,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl CouncilMember for FixedMember {
    fn name(&self) -> &str {
        &self.name
    }

    async fn vote(&self, _prompt: &str) -> Result<String, MemberError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone()
    }
}

#[async_trait]
impl DevilsAdvocate for FixedMember {
    fn name(&self) -> &str {
        &self.name
    }

    async fn review(&self, _prompt: &str) -> Result<String, MemberError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone()
    }
}

// ==================== Control ====================

#[derive(Default)]
pub struct RecordingControl {
    pub sent: Mutex<Vec<ControlSignal>>,
    pub cleared: Mutex<usize>,
}

#[async_trait]
impl ControlSink for RecordingControl {
    async fn send(&self, signal: ControlSignal) -> Result<(), StoreError> {
        self.sent.lock().unwrap().push(signal);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.cleared.lock().unwrap() += 1;
        Ok(())
    }
}
