use autopilot_domain::{CouncilRule, CouncilSchedule};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion council settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilParams {
    /// Members asked per round; fewer answers is a quorum failure
    pub size: usize,
    pub schedule: CouncilSchedule,
    pub rule: CouncilRule,
    /// Budget for collecting every member's vote
    pub vote_timeout: Duration,
    /// Unchanged fingerprints that force an off-interval vote (0 disables)
    pub stagnation_limit: u32,
    pub devils_advocate: bool,
}

impl Default for CouncilParams {
    fn default() -> Self {
        Self {
            size: 3,
            schedule: CouncilSchedule::default(),
            rule: CouncilRule::TwoThirds,
            vote_timeout: Duration::from_secs(300),
            stagnation_limit: 5,
            devils_advocate: true,
        }
    }
}

impl CouncilParams {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_interval(mut self, interval: u64) -> Self {
        self.schedule.interval = interval;
        self
    }

    pub fn with_min_iterations(mut self, min: u64) -> Self {
        self.schedule.min_iterations = min;
        self
    }

    pub fn with_vote_timeout(mut self, timeout: Duration) -> Self {
        self.vote_timeout = timeout;
        self
    }

    pub fn with_stagnation_limit(mut self, limit: u32) -> Self {
        self.stagnation_limit = limit;
        self
    }

    pub fn with_devils_advocate(mut self, enabled: bool) -> Self {
        self.devils_advocate = enabled;
        self
    }
}
