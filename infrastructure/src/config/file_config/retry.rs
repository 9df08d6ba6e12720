//! Retry configuration from TOML (`[retry]` section)

use crate::config::issue::{ConfigIssue, Severity};
use autopilot_domain::{BackoffPolicy, DEFAULT_MAX_RETRIES, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw retry configuration from TOML
///
/// # Example
///
/// ```toml
/// [retry]
/// max_retries = 5              # retries before a task is dead-lettered
/// backoff = "exponential"      # "none", "fixed", "exponential"
/// base_delay_ms = 2000
/// max_delay_ms = 120000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_retries: u32,
    pub backoff: String,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: "none".to_string(),
            base_delay_ms: 2_000,
            max_delay_ms: 120_000,
        }
    }
}

impl FileRetryConfig {
    /// Parse the backoff settings, falling back to no delay on an unknown name.
    pub fn parse_backoff(&self) -> (BackoffPolicy, Vec<ConfigIssue>) {
        let base = Duration::from_millis(self.base_delay_ms);
        match self.backoff.parse::<BackoffPolicy>() {
            Ok(BackoffPolicy::None) => (BackoffPolicy::None, vec![]),
            Ok(BackoffPolicy::Fixed { .. }) => (BackoffPolicy::Fixed { delay: base }, vec![]),
            Ok(BackoffPolicy::Exponential { .. }) => {
                let max = Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms));
                (BackoffPolicy::Exponential { base, max }, vec![])
            }
            Err(_) => {
                let issue = ConfigIssue::invalid_enum(
                    Severity::Warning,
                    "retry.backoff",
                    &self.backoff,
                    &["none", "fixed", "exponential"],
                    format!(
                        "retry.backoff: unknown value '{}', falling back to 'none'",
                        self.backoff
                    ),
                );
                (BackoffPolicy::None, vec![issue])
            }
        }
    }

    pub fn to_policy(&self) -> (RetryPolicy, Vec<ConfigIssue>) {
        let (backoff, mut issues) = self.parse_backoff();
        if self.max_retries == 0 {
            issues.push(ConfigIssue::out_of_range(
                Severity::Warning,
                "retry.max_retries",
                "retry.max_retries = 0: every stalled task is dead-lettered immediately",
            ));
        }
        (RetryPolicy::new(self.max_retries, backoff), issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_uses_configured_delays() {
        let config = FileRetryConfig {
            backoff: "exponential".into(),
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            ..Default::default()
        };
        let (policy, issues) = config.to_policy();
        assert!(issues.is_empty());
        assert_eq!(
            policy.backoff,
            BackoffPolicy::Exponential {
                base: Duration::from_millis(500),
                max: Duration::from_millis(4_000),
            }
        );
        assert_eq!(policy.max_retries, 5);
    }

    #[test]
    fn test_unknown_backoff_warns() {
        let config = FileRetryConfig {
            backoff: "linear".into(),
            ..Default::default()
        };
        let (backoff, issues) = config.parse_backoff();
        assert_eq!(backoff, BackoffPolicy::None);
        assert_eq!(issues[0].severity, Severity::Warning);
    }
}
