//! Retry and dead-letter domain
//!
//! A stalled task is retried until its retry count reaches the cap, then
//! dead-lettered. [`RetryPolicy::decide`] is the single place that rule lives.

pub mod dead_letter;
pub mod policy;

pub use dead_letter::DeadLetterEntry;
pub use policy::{BackoffPolicy, DEFAULT_MAX_RETRIES, RetryDecision, RetryPolicy};
