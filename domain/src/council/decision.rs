//! Council decision rule
//!
//! Deciding a round is two pure passes over the same tally:
//!
//! 1. [`decide`] applies the threshold rule. A unanimous yes is not final;
//!    it asks for a devil's-advocate review.
//! 2. [`apply_devils_advocate`] folds the review verdict (if any) into the
//!    final [`RoundOutcome`].
//!
//! Keeping both passes free of I/O lets the council use case own timeouts
//! and fan-out while the rule stays testable in isolation.

use super::rule::CouncilRule;
use super::vote::VoteTally;
use serde::{Deserialize, Serialize};

/// Result of the threshold pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TentativeDecision {
    Continue,
    Complete,
    /// Unanimous yes; needs a devil's-advocate review before completing
    NeedsDevilsAdvocate,
}

/// Answer of the devil's-advocate re-review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum DevilsAdvocateVerdict {
    /// The reviewer found no reason to keep going
    Confirmed { reasoning: String },
    /// The reviewer found unfinished work; the run continues
    Challenged { reasoning: String },
}

impl DevilsAdvocateVerdict {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, DevilsAdvocateVerdict::Confirmed { .. })
    }

    pub fn reasoning(&self) -> &str {
        match self {
            DevilsAdvocateVerdict::Confirmed { reasoning }
            | DevilsAdvocateVerdict::Challenged { reasoning } => reasoning,
        }
    }
}

/// Final outcome of a council round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Not enough yes votes
    Continue,
    /// The run may stop
    Complete,
    /// Unanimous yes whose devil's-advocate review did not come back
    DevilsAdvocatePending,
    /// Unanimous yes downgraded by the devil's advocate
    Overturned,
}

impl RoundOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundOutcome::Continue => "continue",
            RoundOutcome::Complete => "complete",
            RoundOutcome::DevilsAdvocatePending => "devils_advocate_pending",
            RoundOutcome::Overturned => "overturned",
        }
    }

    /// Only `Complete` stops the run; every other outcome means continue.
    pub fn is_complete(&self) -> bool {
        matches!(self, RoundOutcome::Complete)
    }
}

impl std::fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold pass.
///
/// With `devils_advocate` disabled a unanimous yes completes directly.
pub fn decide(tally: &VoteTally, rule: CouncilRule, devils_advocate: bool) -> TentativeDecision {
    if !rule.is_satisfied(tally.yes_count, tally.total()) {
        return TentativeDecision::Continue;
    }
    if devils_advocate && tally.is_unanimous_yes() {
        TentativeDecision::NeedsDevilsAdvocate
    } else {
        TentativeDecision::Complete
    }
}

/// Verdict pass.
pub fn apply_devils_advocate(
    decision: TentativeDecision,
    verdict: Option<&DevilsAdvocateVerdict>,
) -> RoundOutcome {
    match (decision, verdict) {
        (TentativeDecision::Continue, _) => RoundOutcome::Continue,
        (TentativeDecision::Complete, _) => RoundOutcome::Complete,
        (TentativeDecision::NeedsDevilsAdvocate, None) => RoundOutcome::DevilsAdvocatePending,
        (TentativeDecision::NeedsDevilsAdvocate, Some(v)) if v.is_confirmed() => {
            RoundOutcome::Complete
        }
        (TentativeDecision::NeedsDevilsAdvocate, Some(_)) => RoundOutcome::Overturned,
    }
}
