//! Run configuration container.
//!
//! [`RunConfig`] groups the configuration slices a run needs. Use cases
//! receive only the slice they use; the session runner holds the whole
//! container to build them.

use crate::config::{CouncilParams, ExecutionParams};
use autopilot_domain::{Provider, RetryPolicy};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    pub provider: Provider,
    /// Configured agent concurrency before the provider bound is applied
    pub max_parallel: usize,
    pub retry: RetryPolicy,
    pub execution: ExecutionParams,
    pub council: CouncilParams,
}

impl RunConfig {
    pub fn new(provider: Provider, max_parallel: usize) -> Self {
        Self {
            provider,
            max_parallel,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionParams) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_council(mut self, council: CouncilParams) -> Self {
        self.council = council;
        self
    }

    /// Agent concurrency after applying the provider's capability bound.
    pub fn concurrency(&self) -> usize {
        self.provider.effective_concurrency(self.max_parallel)
    }
}
