//! Backlog parsing
//!
//! A run is seeded from a JSON document listing SDLC phases and their tasks.
//! Tasks may be plain description strings or objects:
//!
//! ```json
//! {
//!   "phases": [
//!     { "name": "requirements", "tasks": [{ "description": "write PRD", "priority": 2, "role": "planning" }] },
//!     { "name": "implementation", "tasks": ["add login endpoint"] }
//!   ]
//! }
//! ```

use crate::agent::AgentRole;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacklogError {
    #[error("Invalid backlog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backlog has no phases")]
    Empty,

    #[error("Task {index} of phase '{phase}' has an empty description")]
    EmptyTask { phase: String, index: usize },

    #[error("Task id '{id}' in phase '{phase}' is already used by an earlier task")]
    DuplicateTask { id: String, phase: String },
}

/// One task entry of a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskSpec {
    Plain(String),
    Detailed {
        description: String,
        #[serde(default)]
        priority: i32,
        #[serde(default)]
        role: Option<AgentRole>,
        #[serde(default)]
        id: Option<String>,
    },
}

impl TaskSpec {
    pub fn description(&self) -> &str {
        match self {
            TaskSpec::Plain(d) | TaskSpec::Detailed { description: d, .. } => d,
        }
    }

    /// Explicit id, if the entry names one
    pub fn id(&self) -> Option<&str> {
        match self {
            TaskSpec::Detailed { id: Some(id), .. } => Some(id.as_str()),
            _ => None,
        }
    }

    fn to_task(&self, phase: usize, default_role: AgentRole) -> Task {
        match self {
            TaskSpec::Plain(description) => Task::new(description.trim())
                .with_phase(phase)
                .with_role(default_role),
            TaskSpec::Detailed {
                description,
                priority,
                role,
                id,
            } => {
                let task = Task::new(description.trim())
                    .with_phase(phase)
                    .with_priority(*priority)
                    .with_role(role.unwrap_or(default_role));
                match id {
                    Some(id) => task.with_id(id.as_str()),
                    None => task,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backlog {
    pub phases: Vec<PhaseSpec>,
}

impl Backlog {
    /// Parse and validate a backlog document.
    pub fn from_json(json: &str) -> Result<Self, BacklogError> {
        let backlog: Backlog = serde_json::from_str(json)?;
        backlog.validate()?;
        Ok(backlog)
    }

    /// Explicit task ids must be unique across all phases; the queue would
    /// otherwise reject the later task only when its phase starts.
    fn validate(&self) -> Result<(), BacklogError> {
        if self.phases.is_empty() {
            return Err(BacklogError::Empty);
        }
        let mut ids = HashSet::new();
        for phase in &self.phases {
            if let Some(index) = phase
                .tasks
                .iter()
                .position(|t| t.description().trim().is_empty())
            {
                return Err(BacklogError::EmptyTask {
                    phase: phase.name.clone(),
                    index,
                });
            }
            if let Some(id) = phase
                .tasks
                .iter()
                .filter_map(TaskSpec::id)
                .find(|id| !ids.insert(*id))
            {
                return Err(BacklogError::DuplicateTask {
                    id: id.to_string(),
                    phase: phase.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn phase_name(&self, phase: usize) -> Option<&str> {
        self.phases.get(phase).map(|p| p.name.as_str())
    }

    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Fresh tasks for the given phase, tagged with the phase index.
    ///
    /// Planning-sounding phases default to the planning role; everything
    /// else defaults to development.
    pub fn tasks_for_phase(&self, phase: usize) -> Vec<Task> {
        let Some(spec) = self.phases.get(phase) else {
            return Vec::new();
        };
        let default_role = default_role_for(&spec.name);
        spec.tasks
            .iter()
            .map(|t| t.to_task(phase, default_role))
            .collect()
    }
}

fn default_role_for(phase_name: &str) -> AgentRole {
    let name = phase_name.to_lowercase();
    if ["requirement", "architecture", "design", "planning"]
        .iter()
        .any(|k| name.contains(k))
    {
        AgentRole::Planning
    } else {
        AgentRole::Development
    }
}
