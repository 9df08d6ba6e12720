//! Agent domain entities

use crate::core::error::DomainError;
use crate::core::ids::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability tier of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Architecture, requirements and other reasoning-heavy work
    Planning,
    /// Implementation work (default)
    #[default]
    Development,
    /// Small mechanical tasks
    Fast,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planning => "planning",
            AgentRole::Development => "development",
            AgentRole::Fast => "fast",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" | "plan" => Ok(AgentRole::Planning),
            "development" | "dev" => Ok(AgentRole::Development),
            "fast" => Ok(AgentRole::Fast),
            _ => Err(format!(
                "Unknown agent role: {s}. Valid: planning, development, fast"
            )),
        }
    }
}

/// Lifecycle state of an agent
///
/// ```text
/// spawn → ready → working → reporting → terminated
///                   ↑   │
///            retrying ← error ──(retries exhausted)──→ terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Spawn,
    Ready,
    Working,
    Reporting,
    Error,
    Retrying,
    Terminated,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Spawn => "spawn",
            AgentState::Ready => "ready",
            AgentState::Working => "working",
            AgentState::Reporting => "reporting",
            AgentState::Error => "error",
            AgentState::Retrying => "retrying",
            AgentState::Terminated => "terminated",
        }
    }

    /// States that hold a task and therefore occupy a concurrency slot
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AgentState::Working | AgentState::Reporting | AgentState::Error | AgentState::Retrying
        )
    }

    fn can_transition_to(&self, next: AgentState) -> bool {
        use AgentState::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Spawn, Ready)
            | (Ready, Working)
            | (Working, Reporting)
            | (Working, Error)
            | (Error, Retrying)
            | (Retrying, Working) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-use worker agent.
///
/// The agent only records the identifier of its task; the task itself is
/// owned by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub role: AgentRole,
    state: AgentState,
    task_id: Option<TaskId>,
    internal_retries: u32,
    last_error: Option<String>,
    spawned_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Agent {
    /// Create an agent in the `spawn` state.
    pub fn spawn(role: AgentRole, now: DateTime<Utc>) -> Self {
        Self {
            id: AgentId::generate(),
            role,
            state: AgentState::Spawn,
            task_id: None,
            internal_retries: 0,
            last_error: None,
            spawned_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    pub fn internal_retries(&self) -> u32 {
        self.internal_retries
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn spawned_at(&self) -> DateTime<Utc> {
        self.spawned_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn transition(&mut self, next: AgentState, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::transition("agent", self.state, next));
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// `spawn → ready`
    pub fn mark_ready(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(AgentState::Ready, now)
    }

    /// `ready → working`, binding the task identifier.
    ///
    /// Fails with [`DomainError::AgentBusy`] unless the agent is `ready`.
    pub fn assign(&mut self, task_id: TaskId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state != AgentState::Ready {
            return Err(DomainError::AgentBusy {
                agent: self.id.clone(),
                state: self.state.to_string(),
            });
        }
        self.transition(AgentState::Working, now)?;
        self.task_id = Some(task_id);
        Ok(())
    }

    /// `working → reporting`
    pub fn report(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(AgentState::Reporting, now)
    }

    /// `working → error`
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(AgentState::Error, now)?;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// `error → retrying`; returns the internal retry count.
    pub fn retry(&mut self, now: DateTime<Utc>) -> Result<u32, DomainError> {
        self.transition(AgentState::Retrying, now)?;
        self.internal_retries += 1;
        Ok(self.internal_retries)
    }

    /// `retrying → working`
    pub fn resume_work(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(AgentState::Working, now)
    }

    /// Any state → `terminated`. Idempotent.
    pub fn terminate(&mut self, now: DateTime<Utc>) {
        if self.state != AgentState::Terminated {
            self.state = AgentState::Terminated;
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_agent() -> Agent {
        let mut agent = Agent::spawn(AgentRole::Development, Utc::now());
        agent.mark_ready(Utc::now()).unwrap();
        agent
    }

    #[test]
    fn test_spawn_then_ready() {
        let mut agent = Agent::spawn(AgentRole::Fast, Utc::now());
        assert_eq!(agent.state(), AgentState::Spawn);
        agent.mark_ready(Utc::now()).unwrap();
        assert_eq!(agent.state(), AgentState::Ready);
    }

    #[test]
    fn test_assign_binds_task_id() {
        let mut agent = ready_agent();
        agent.assign(TaskId::new("t1"), Utc::now()).unwrap();
        assert_eq!(agent.state(), AgentState::Working);
        assert_eq!(agent.task_id(), Some(&TaskId::new("t1")));
    }

    #[test]
    fn test_assign_busy_agent_fails() {
        let mut agent = ready_agent();
        agent.assign(TaskId::new("t1"), Utc::now()).unwrap();
        let err = agent.assign(TaskId::new("t2"), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::AgentBusy { ref state, .. } if state == "working"));
        assert_eq!(agent.task_id(), Some(&TaskId::new("t1")));
    }

    #[test]
    fn test_error_retry_cycle() {
        let mut agent = ready_agent();
        agent.assign(TaskId::new("t1"), Utc::now()).unwrap();
        agent.fail("rate limited", Utc::now()).unwrap();
        assert_eq!(agent.state(), AgentState::Error);
        assert_eq!(agent.retry(Utc::now()).unwrap(), 1);
        agent.resume_work(Utc::now()).unwrap();
        assert_eq!(agent.state(), AgentState::Working);
        assert_eq!(agent.last_error(), Some("rate limited"));
    }

    #[test]
    fn test_success_path_is_single_use() {
        let mut agent = ready_agent();
        agent.assign(TaskId::new("t1"), Utc::now()).unwrap();
        agent.report(Utc::now()).unwrap();
        agent.terminate(Utc::now());
        assert_eq!(agent.state(), AgentState::Terminated);
        assert!(agent.mark_ready(Utc::now()).is_err());
    }

    #[test]
    fn test_busy_states() {
        assert!(AgentState::Working.is_busy());
        assert!(AgentState::Retrying.is_busy());
        assert!(!AgentState::Ready.is_busy());
        assert!(!AgentState::Terminated.is_busy());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("Planning".parse::<AgentRole>().ok(), Some(AgentRole::Planning));
        assert_eq!("dev".parse::<AgentRole>().ok(), Some(AgentRole::Development));
        assert!("boss".parse::<AgentRole>().is_err());
    }
}
