//! Task executor backed by a provider CLI

use super::command::{CliError, ProviderCommand};
use async_trait::async_trait;
use autopilot_application::{ExecutionError, TaskExecutor};
use autopilot_domain::Task;
use tracing::debug;

pub struct CliTaskExecutor {
    command: ProviderCommand,
}

impl CliTaskExecutor {
    pub fn new(command: ProviderCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl TaskExecutor for CliTaskExecutor {
    async fn execute(&self, task: &Task, prompt: &str) -> Result<String, ExecutionError> {
        debug!("Executing task {} via {}", task.id, self.command.binary());
        self.command.run(prompt).await.map_err(|e| match e {
            CliError::Spawn { .. } => ExecutionError::Fatal(e.to_string()),
            CliError::Exit { .. } => ExecutionError::Transient(e.to_string()),
        })
    }
}
