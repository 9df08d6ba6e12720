//! Retry policy for stalled tasks
//!
//! The policy answers two questions for the retry manager: may a stalled task
//! run again, and how long to wait before it becomes pickable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default retry cap per task
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Delay applied before a retried task is re-queued
///
/// # Example
///
/// ```
/// use autopilot_domain::retry::BackoffPolicy;
/// use std::time::Duration;
///
/// let backoff = BackoffPolicy::Exponential {
///     base: Duration::from_secs(2),
///     max: Duration::from_secs(60),
/// };
/// assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
/// assert_eq!(backoff.delay_for(3), Duration::from_secs(8));
/// assert_eq!(backoff.delay_for(10), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackoffPolicy {
    /// Re-queue immediately
    #[default]
    None,
    /// Same delay for every attempt
    Fixed { delay: Duration },
    /// `base * 2^(attempt-1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl BackoffPolicy {
    /// Delay before re-queueing retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            BackoffPolicy::None => Duration::ZERO,
            BackoffPolicy::Fixed { delay } => *delay,
            BackoffPolicy::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(31);
                base.checked_mul(1u32 << exponent)
                    .map_or(*max, |delay| delay.min(*max))
            }
        }
    }
}

impl std::str::FromStr for BackoffPolicy {
    type Err = String;

    /// Parses the kind only; delays come from the surrounding configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "immediate" => Ok(BackoffPolicy::None),
            "fixed" => Ok(BackoffPolicy::Fixed {
                delay: Duration::from_secs(5),
            }),
            "exponential" | "exp" => Ok(BackoffPolicy::Exponential {
                base: Duration::from_secs(2),
                max: Duration::from_secs(120),
            }),
            other => Err(format!(
                "Unknown backoff policy: {other}. Valid: none, fixed, exponential"
            )),
        }
    }
}

/// What to do with a task whose retry count was just incremented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-queue after `delay`
    Requeue { attempt: u32, delay: Duration },
    /// Retry budget exhausted
    DeadLetter { attempts: u32 },
}

/// Retry cap plus backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Decide from the retry count *after* the `stalled → retrying` increment.
    ///
    /// A task dead-letters exactly when its count reaches `max_retries`.
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count >= self.max_retries {
            RetryDecision::DeadLetter {
                attempts: retry_count,
            }
        } else {
            RetryDecision::Requeue {
                attempt: retry_count,
                delay: self.backoff.delay_for(retry_count),
            }
        }
    }
}
