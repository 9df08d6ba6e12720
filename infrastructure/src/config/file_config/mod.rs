//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; conversion into the application's run
//! configuration happens in [`FileConfig::to_run_config`].

mod agent;
mod council;
mod provider;
mod queue;
mod retry;
mod session;

pub use agent::FileAgentConfig;
pub use council::FileCouncilConfig;
pub use provider::FileProviderConfig;
pub use queue::FileQueueConfig;
pub use retry::FileRetryConfig;
pub use session::FileSessionConfig;

use crate::config::issue::{ConfigIssue, Severity};
use autopilot_application::{ExecutionParams, RunConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Provider CLI selection
    pub provider: FileProviderConfig,
    /// Stall detection
    pub queue: FileQueueConfig,
    /// Retry cap and backoff
    pub retry: FileRetryConfig,
    /// Completion council
    pub council: FileCouncilConfig,
    /// Agent worker loop
    pub agent: FileAgentConfig,
    /// Session limits and state location
    pub session: FileSessionConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Issues with [`Severity::Error`] must abort the run; warnings mean a
    /// default was substituted.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let (provider, provider_issues) = self.provider.parse_provider();
        issues.extend(provider_issues);
        issues.extend(self.provider.parse_max_parallel(provider).1);
        issues.extend(self.retry.to_policy().1);
        issues.extend(self.council.to_params().1);

        let zero_checks = [
            (self.queue.stall_timeout_secs, "queue.stall_timeout_secs"),
            (self.queue.sweep_interval_secs, "queue.sweep_interval_secs"),
            (self.agent.task_timeout_secs, "agent.task_timeout_secs"),
            (self.session.poll_interval_ms, "session.poll_interval_ms"),
        ];
        for (value, field) in zero_checks {
            if value == 0 {
                issues.push(ConfigIssue::out_of_range(
                    Severity::Error,
                    field,
                    format!("{} cannot be 0", field),
                ));
            }
        }

        let worst_case = self
            .agent
            .task_timeout_secs
            .saturating_mul(u64::from(self.agent.max_internal_retries) + 1);
        if self.queue.stall_timeout_secs > 0 && worst_case >= self.queue.stall_timeout_secs {
            issues.push(ConfigIssue::out_of_range(
                Severity::Error,
                "agent.task_timeout_secs",
                format!(
                    "agent.task_timeout_secs ({}) x (agent.max_internal_retries ({}) + 1) = {}s is not below queue.stall_timeout_secs ({}); a slow task would be swept and run by a second agent while the first is still working",
                    self.agent.task_timeout_secs,
                    self.agent.max_internal_retries,
                    worst_case,
                    self.queue.stall_timeout_secs
                ),
            ));
        }

        if self.session.state_dir.as_os_str().is_empty() {
            issues.push(ConfigIssue::out_of_range(
                Severity::Error,
                "session.state_dir",
                "session.state_dir cannot be empty",
            ));
        }

        issues
    }

    /// Build the run configuration. Invalid values fall back to defaults;
    /// call [`validate`](Self::validate) first to report them.
    pub fn to_run_config(&self) -> RunConfig {
        let (provider, _) = self.provider.parse_provider();
        let (max_parallel, _) = self.provider.parse_max_parallel(provider);
        let (retry, _) = self.retry.to_policy();
        let (council, _) = self.council.to_params();

        let execution = ExecutionParams::default()
            .with_stall_timeout(Duration::from_secs(self.queue.stall_timeout_secs))
            .with_sweep_interval(Duration::from_secs(self.queue.sweep_interval_secs.max(1)))
            .with_max_internal_retries(self.agent.max_internal_retries)
            .with_task_timeout(Duration::from_secs(self.agent.task_timeout_secs))
            .with_max_iterations(self.session.max_iterations)
            .with_session_max_retries(self.session.max_retries)
            .with_poll_interval(Duration::from_millis(self.session.poll_interval_ms.max(1)));

        RunConfig::new(provider, max_parallel)
            .with_retry(retry)
            .with_execution(execution)
            .with_council(council)
    }

    /// Render the effective configuration as TOML (for `autopilot config show`).
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
