//! Council vote rounds

use super::decision::{DevilsAdvocateVerdict, RoundOutcome, TentativeDecision, apply_devils_advocate, decide};
use super::rule::CouncilRule;
use super::vote::{Vote, VoteTally};
use crate::core::ids::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One council round, immutable once tallied.
///
/// A round whose tally asks for a devil's-advocate review starts out
/// [`RoundOutcome::DevilsAdvocatePending`]; [`CouncilRound::with_verdict`]
/// consumes it and yields the finalized round. Nothing else can change a
/// round after construction.
///
/// # Example
///
/// ```
/// use autopilot_domain::council::{CouncilRound, CouncilRule, RoundOutcome, Vote};
/// use autopilot_domain::SessionId;
/// use chrono::Utc;
///
/// let round = CouncilRound::new(
///     SessionId::new("s"),
///     1,
///     10,
///     vec![
///         Vote::complete("a", "done"),
///         Vote::complete("b", "done"),
///         Vote::continue_work("c", "flaky test"),
///     ],
///     CouncilRule::TwoThirds,
///     true,
///     Utc::now(),
/// );
/// assert_eq!(round.outcome(), RoundOutcome::Complete);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilRound {
    session_id: SessionId,
    round: u32,
    iteration: u64,
    rule: CouncilRule,
    tally: VoteTally,
    outcome: RoundOutcome,
    devils_advocate: Option<DevilsAdvocateVerdict>,
    timestamp: DateTime<Utc>,
}

impl CouncilRound {
    /// Tally `votes` and apply the threshold pass.
    pub fn new(
        session_id: SessionId,
        round: u32,
        iteration: u64,
        votes: Vec<Vote>,
        rule: CouncilRule,
        devils_advocate: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let tally = VoteTally::from_votes(votes);
        let outcome = apply_devils_advocate(decide(&tally, rule, devils_advocate), None);
        Self {
            session_id,
            round,
            iteration,
            rule,
            tally,
            outcome,
            devils_advocate: None,
            timestamp: now,
        }
    }

    /// Finalize a pending round with the devil's-advocate verdict.
    ///
    /// Rounds that are not pending are returned unchanged.
    pub fn with_verdict(self, verdict: DevilsAdvocateVerdict) -> Self {
        if !self.needs_devils_advocate() {
            return self;
        }
        let outcome =
            apply_devils_advocate(TentativeDecision::NeedsDevilsAdvocate, Some(&verdict));
        Self {
            outcome,
            devils_advocate: Some(verdict),
            ..self
        }
    }

    pub fn needs_devils_advocate(&self) -> bool {
        self.outcome == RoundOutcome::DevilsAdvocatePending
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn rule(&self) -> CouncilRule {
        self.rule
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    pub fn outcome(&self) -> RoundOutcome {
        self.outcome
    }

    pub fn devils_advocate(&self) -> Option<&DevilsAdvocateVerdict> {
        self.devils_advocate.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    /// Human-readable section for the decision report
    pub fn render_report(&self) -> String {
        let mut out = format!(
            "## Round {} (iteration {})\n\n- Outcome: **{}**\n- Votes: {} {}/{} yes ({})\n",
            self.round,
            self.iteration,
            self.outcome,
            self.tally.vote_summary(),
            self.tally.yes_count,
            self.tally.total(),
            self.rule,
        );
        for vote in &self.tally.votes {
            out.push_str(&format!(
                "  - {} voted {}: {}\n",
                vote.member,
                if vote.complete { "COMPLETE" } else { "CONTINUE" },
                vote.reasoning
            ));
        }
        if let Some(verdict) = &self.devils_advocate {
            out.push_str(&format!(
                "- Devil's advocate {}: {}\n",
                if verdict.is_confirmed() { "confirmed" } else { "challenged" },
                verdict.reasoning()
            ));
        }
        out
    }
}
