//! Council member and devil's-advocate adapters backed by a provider CLI

use super::command::{CliError, ProviderCommand};
use async_trait::async_trait;
use autopilot_application::{CouncilMember, DevilsAdvocate, MemberError};
use std::sync::Arc;

fn member_error(e: CliError) -> MemberError {
    match e {
        CliError::Spawn { .. } => MemberError::Unavailable(e.to_string()),
        CliError::Exit { .. } => MemberError::Failed(e.to_string()),
    }
}

pub struct CliCouncilMember {
    name: String,
    command: ProviderCommand,
}

impl CliCouncilMember {
    pub fn new(name: impl Into<String>, command: ProviderCommand) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }
}

#[async_trait]
impl CouncilMember for CliCouncilMember {
    fn name(&self) -> &str {
        &self.name
    }

    async fn vote(&self, prompt: &str) -> Result<String, MemberError> {
        self.command.run(prompt).await.map_err(member_error)
    }
}

pub struct CliDevilsAdvocate {
    name: String,
    command: ProviderCommand,
}

impl CliDevilsAdvocate {
    pub fn new(command: ProviderCommand) -> Self {
        Self {
            name: format!("{}-devils-advocate", command.provider()),
            command,
        }
    }
}

#[async_trait]
impl DevilsAdvocate for CliDevilsAdvocate {
    fn name(&self) -> &str {
        &self.name
    }

    async fn review(&self, prompt: &str) -> Result<String, MemberError> {
        self.command.run(prompt).await.map_err(member_error)
    }
}

/// `size` independent members running the same CLI, named `<provider>-<n>`.
pub fn council_members(command: &ProviderCommand, size: usize) -> Vec<Arc<dyn CouncilMember>> {
    (1..=size)
        .map(|n| {
            Arc::new(CliCouncilMember::new(
                format!("{}-{}", command.provider(), n),
                command.clone(),
            )) as Arc<dyn CouncilMember>
        })
        .collect()
}
