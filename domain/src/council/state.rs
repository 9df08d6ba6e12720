//! Running council state, persisted after every round

use super::decision::RoundOutcome;
use super::round::CouncilRound;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilState {
    /// Number of the last finalized round (0 before the first vote)
    pub round: u32,
    pub last_outcome: Option<RoundOutcome>,
    pub last_iteration: Option<u64>,
    /// Consecutive rounds that reached `complete`
    pub consecutive_complete: u32,
    /// Rounds discarded for missing votes
    pub quorum_failures: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CouncilState {
    /// Round number for the next vote
    pub fn next_round(&self) -> u32 {
        self.round + 1
    }

    pub fn record(&mut self, round: &CouncilRound) {
        self.round = round.round();
        self.last_outcome = Some(round.outcome());
        self.last_iteration = Some(round.iteration());
        if round.is_complete() {
            self.consecutive_complete += 1;
        } else {
            self.consecutive_complete = 0;
        }
        self.updated_at = Some(round.timestamp());
    }

    pub fn record_quorum_failure(&mut self, now: DateTime<Utc>) {
        self.quorum_failures += 1;
        self.updated_at = Some(now);
    }
}
