//! Completion Council use case
//!
//! Asks every council member for a vote concurrently, tallies the votes, and
//! runs the devil's-advocate pass for unanimous rounds. Finalized rounds,
//! the council state and the decision report are persisted after each vote.
//!
//! A round for which fewer members than the council size answered within
//! the vote timeout is discarded with [`DomainError::QuorumError`]; the run
//! continues as if the council had voted "continue".

use crate::config::CouncilParams;
use crate::ports::council_member::{CouncilMember, DevilsAdvocate, MemberError};
use crate::ports::event_logger::{EventLogger, NoEventLogger, RunEvent};
use crate::ports::progress::RunProgressNotifier;
use crate::ports::state_store::{CouncilRepository, StoreError};
use autopilot_domain::{
    ConvergenceEntry, ConvergenceSignal, ConvergenceTracker, CouncilBrief, CouncilPrompt,
    CouncilRound, CouncilState, DomainError, SessionContext, Vote,
};
use autopilot_domain::council::{parse_completion_vote, parse_devils_advocate};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors from a council check
#[derive(Error, Debug)]
pub enum CouncilError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Ledger {
    state: CouncilState,
    tracker: ConvergenceTracker,
    report: String,
}

pub struct CompletionCouncil {
    members: Vec<Arc<dyn CouncilMember>>,
    devils_advocate: Option<Arc<dyn DevilsAdvocate>>,
    params: CouncilParams,
    repository: Arc<dyn CouncilRepository>,
    context: SessionContext,
    ledger: Mutex<Ledger>,
    events: Arc<dyn EventLogger>,
}

impl CompletionCouncil {
    pub fn new(
        members: Vec<Arc<dyn CouncilMember>>,
        params: CouncilParams,
        repository: Arc<dyn CouncilRepository>,
        context: SessionContext,
    ) -> Self {
        let report = format!(
            "# Completion council report\n\nSession `{}`, rule: {}, members: {}\n\n",
            context.session_id,
            params.rule,
            members.len()
        );
        Self {
            members,
            devils_advocate: None,
            ledger: Mutex::new(Ledger {
                state: CouncilState::default(),
                tracker: ConvergenceTracker::new(params.stagnation_limit),
                report,
            }),
            params,
            repository,
            context,
            events: Arc::new(NoEventLogger),
        }
    }

    pub fn with_devils_advocate(mut self, reviewer: Arc<dyn DevilsAdvocate>) -> Self {
        self.devils_advocate = Some(reviewer);
        self
    }

    pub fn with_event_logger(mut self, events: Arc<dyn EventLogger>) -> Self {
        self.events = events;
        self
    }

    pub fn params(&self) -> &CouncilParams {
        &self.params
    }

    pub async fn state(&self) -> CouncilState {
        self.ledger.lock().await.state.clone()
    }

    /// Append a workspace fingerprint to the convergence log.
    pub async fn record_iteration(
        &self,
        iteration: u64,
        fingerprint: &str,
    ) -> Result<ConvergenceSignal, StoreError> {
        let entry = ConvergenceEntry {
            iteration,
            hash: fingerprint.to_string(),
            recorded_at: Utc::now(),
        };
        self.repository.append_convergence(&entry).await?;
        let signal = self.ledger.lock().await.tracker.record(fingerprint);
        if let ConvergenceSignal::Stagnant { repeats } = signal {
            info!(
                "Workspace unchanged for {} iterations; forcing a council vote",
                repeats
            );
        }
        Ok(signal)
    }

    /// Whether a vote is due at `iteration`.
    pub fn is_due(&self, iteration: u64, stagnant: bool) -> bool {
        !self.members.is_empty() && self.params.schedule.is_due(iteration, stagnant)
    }

    /// Run one council round.
    ///
    /// Returns the finalized round, or `QuorumError` when not every member
    /// answered in time. A discarded round is not persisted.
    pub async fn check_convergence(
        &self,
        iteration: u64,
        mut brief: CouncilBrief,
        progress: &dyn RunProgressNotifier,
    ) -> Result<CouncilRound, CouncilError> {
        let round_no = self.ledger.lock().await.state.next_round();
        brief.iteration = iteration;
        brief.round = round_no;
        info!(
            "Council round {} at iteration {} ({} members)",
            round_no,
            iteration,
            self.members.len()
        );

        let votes = self.collect_votes(&CouncilPrompt::vote(&brief)).await;
        let required = self.params.size.max(1);
        if votes.len() < required {
            let err = DomainError::QuorumError {
                received: votes.len(),
                required,
            };
            warn!("Council round {} discarded: {}", round_no, err);
            progress.on_council_quorum_missed(votes.len(), required);
            let mut ledger = self.ledger.lock().await;
            ledger.state.record_quorum_failure(Utc::now());
            self.repository.save_state(&ledger.state).await?;
            drop(ledger);
            self.events.log(RunEvent::new(
                "council_quorum_missed",
                json!({
                    "session_id": self.context.session_id,
                    "round": round_no,
                    "received": votes.len(),
                    "required": required,
                }),
            ));
            return Err(err.into());
        }

        let mut round = CouncilRound::new(
            self.context.session_id.clone(),
            round_no,
            iteration,
            votes,
            self.params.rule,
            self.params.devils_advocate,
            Utc::now(),
        );

        if round.needs_devils_advocate() {
            round = self.devils_advocate_pass(round, &brief).await;
        }

        self.persist(&round).await?;
        info!(
            "Council round {}: {} {} -> {}",
            round_no,
            round.tally().vote_summary(),
            self.params.rule,
            round.outcome()
        );
        progress.on_council_round(&round);
        self.events.log(RunEvent::new(
            "council_round",
            json!({
                "session_id": self.context.session_id,
                "round": round.round(),
                "iteration": iteration,
                "yes": round.tally().yes_count,
                "no": round.tally().no_count,
                "outcome": round.outcome(),
            }),
        ));
        Ok(round)
    }

    async fn collect_votes(&self, prompt: &str) -> Vec<Vote> {
        let mut join_set = JoinSet::new();
        for member in self.members.iter().take(self.params.size.max(1)) {
            let member = Arc::clone(member);
            let prompt = prompt.to_string();
            join_set.spawn(async move {
                let result = member.vote(&prompt).await;
                (member.name().to_string(), result)
            });
        }

        let mut votes = Vec::new();
        let collected = tokio::time::timeout(self.params.vote_timeout, async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((name, Ok(answer))) => {
                        let (complete, reasoning) = parse_completion_vote(&answer);
                        debug!("Member {} voted complete={}", name, complete);
                        votes.push(Vote::new(name, complete, reasoning));
                    }
                    Ok((name, Err(e))) => {
                        warn!("Member {} did not vote: {}", name, e);
                    }
                    Err(e) => {
                        warn!("Task join error: {}", e);
                    }
                }
            }
        })
        .await;

        if collected.is_err() {
            warn!(
                "Vote timeout after {:?}; {} vote(s) collected",
                self.params.vote_timeout,
                votes.len()
            );
            join_set.abort_all();
        }
        votes
    }

    /// Second pass over a unanimous round. Without a reviewer, or when the
    /// reviewer does not answer, the round stays pending (treated as continue).
    async fn devils_advocate_pass(&self, round: CouncilRound, brief: &CouncilBrief) -> CouncilRound {
        let Some(reviewer) = &self.devils_advocate else {
            warn!("Unanimous round {} has no devil's advocate configured", round.round());
            return round;
        };
        let prompt = CouncilPrompt::devils_advocate(brief, round.tally());
        let answer = match tokio::time::timeout(self.params.vote_timeout, reviewer.review(&prompt)).await {
            Ok(answer) => answer,
            Err(_) => Err(MemberError::Timeout),
        };
        match answer {
            Ok(text) => {
                let verdict = parse_devils_advocate(&text);
                info!(
                    "Devil's advocate {} {} round {}",
                    reviewer.name(),
                    if verdict.is_confirmed() { "confirmed" } else { "challenged" },
                    round.round()
                );
                round.with_verdict(verdict)
            }
            Err(e) => {
                warn!("Devil's advocate {} did not answer: {}", reviewer.name(), e);
                round
            }
        }
    }

    async fn persist(&self, round: &CouncilRound) -> Result<(), StoreError> {
        self.repository.save_round(round).await?;
        let mut ledger = self.ledger.lock().await;
        ledger.state.record(round);
        ledger.report.push_str(&round.render_report());
        ledger.report.push('\n');
        self.repository.save_state(&ledger.state).await?;
        self.repository.write_report(&ledger.report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::progress::NoProgress;
    use crate::use_cases::test_support::{FixedMember, MemoryCouncilRepository};
    use autopilot_domain::{RoundOutcome, SessionId};
    use std::time::Duration;

    fn brief() -> CouncilBrief {
        CouncilBrief {
            iteration: 0,
            round: 0,
            phase_name: Some("implementation".into()),
            queue: Default::default(),
            dead_letters: vec![],
        }
    }

    fn council(
        members: Vec<FixedMember>,
        reviewer: Option<FixedMember>,
    ) -> (CompletionCouncil, Arc<MemoryCouncilRepository>) {
        let repo = Arc::new(MemoryCouncilRepository::default());
        let members: Vec<Arc<dyn CouncilMember>> = members
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn CouncilMember>)
            .collect();
        let mut council = CompletionCouncil::new(
            members,
            CouncilParams::default().with_vote_timeout(Duration::from_secs(10)),
            repo.clone(),
            SessionContext::new(SessionId::new("s1"), Utc::now()),
        );
        if let Some(reviewer) = reviewer {
            council = council.with_devils_advocate(Arc::new(reviewer));
        }
        (council, repo)
    }

    #[tokio::test]
    async fn test_two_of_three_completes() {
        let (council, repo) = council(
            vec![FixedMember::yes("a"), FixedMember::yes("b"), FixedMember::no("c")],
            None,
        );
        let round = council.check_convergence(5, brief(), &NoProgress).await.unwrap();
        assert_eq!(round.outcome(), RoundOutcome::Complete);
        assert_eq!(round.round(), 1);
        assert_eq!(repo.rounds().len(), 1);
        assert_eq!(council.state().await.consecutive_complete, 1);
        assert!(repo.report.lock().unwrap().contains("Round 1"));
    }

    #[tokio::test]
    async fn test_one_of_three_continues() {
        let (council, _) = council(
            vec![FixedMember::yes("a"), FixedMember::no("b"), FixedMember::no("c")],
            None,
        );
        let round = council.check_convergence(5, brief(), &NoProgress).await.unwrap();
        assert_eq!(round.outcome(), RoundOutcome::Continue);
    }

    #[tokio::test]
    async fn test_unanimous_challenged_is_overturned() {
        let reviewer = FixedMember::answer(
            "da",
            Ok("The CLI help text is missing.\nVERDICT: CHALLENGE".into()),
        );
        let (council, repo) = council(
            vec![FixedMember::yes("a"), FixedMember::yes("b"), FixedMember::yes("c")],
            Some(reviewer),
        );
        let round = council.check_convergence(10, brief(), &NoProgress).await.unwrap();
        assert_eq!(round.outcome(), RoundOutcome::Overturned);
        assert!(!round.is_complete());
        assert!(round.devils_advocate().is_some());
        assert_eq!(repo.rounds()[0].outcome(), RoundOutcome::Overturned);
    }

    #[tokio::test]
    async fn test_unanimous_confirmed_completes() {
        let reviewer = FixedMember::answer("da", Ok("Nothing left.\nVERDICT: CONFIRM".into()));
        let (council, _) = council(
            vec![FixedMember::yes("a"), FixedMember::yes("b"), FixedMember::yes("c")],
            Some(reviewer),
        );
        let round = council.check_convergence(10, brief(), &NoProgress).await.unwrap();
        assert_eq!(round.outcome(), RoundOutcome::Complete);
    }

    #[tokio::test]
    async fn test_unanimous_without_reviewer_stays_pending() {
        let (council, _) = council(
            vec![FixedMember::yes("a"), FixedMember::yes("b"), FixedMember::yes("c")],
            Some(FixedMember::answer("da", Err(MemberError::Failed("crash".into())))),
        );
        let round = council.check_convergence(10, brief(), &NoProgress).await.unwrap();
        assert_eq!(round.outcome(), RoundOutcome::DevilsAdvocatePending);
        assert!(!round.is_complete());
    }

    #[tokio::test]
    async fn test_failed_member_is_quorum_error() {
        let (council, repo) = council(
            vec![
                FixedMember::yes("a"),
                FixedMember::yes("b"),
                FixedMember::answer("c", Err(MemberError::Unavailable("offline".into()))),
            ],
            None,
        );
        let err = council.check_convergence(5, brief(), &NoProgress).await.unwrap_err();
        assert!(matches!(
            err,
            CouncilError::Domain(DomainError::QuorumError { received: 2, required: 3 })
        ));
        // Discarded round: nothing persisted, the round number is reused
        assert!(repo.rounds().is_empty());
        assert_eq!(council.state().await.quorum_failures, 1);
        assert_eq!(council.state().await.next_round(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_member_times_out() {
        let (council, _) = council(
            vec![
                FixedMember::yes("a"),
                FixedMember::yes("b"),
                FixedMember::yes("c").slow(Duration::from_secs(60)),
            ],
            None,
        );
        let err = council.check_convergence(5, brief(), &NoProgress).await.unwrap_err();
        assert!(matches!(
            err,
            CouncilError::Domain(DomainError::QuorumError { received: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_stagnation_forces_vote() {
        let repo = Arc::new(MemoryCouncilRepository::default());
        let council = CompletionCouncil::new(
            vec![Arc::new(FixedMember::no("a")) as Arc<dyn CouncilMember>],
            CouncilParams::default()
                .with_interval(100)
                .with_min_iterations(1)
                .with_stagnation_limit(2),
            repo.clone(),
            SessionContext::new(SessionId::new("s1"), Utc::now()),
        );

        let mut signal = council.record_iteration(1, "abc").await.unwrap();
        assert!(!council.is_due(1, signal.is_stagnant()));
        council.record_iteration(2, "abc").await.unwrap();
        signal = council.record_iteration(3, "abc").await.unwrap();
        assert!(signal.is_stagnant());
        assert!(council.is_due(3, signal.is_stagnant()));
        assert_eq!(repo.convergence.lock().unwrap().len(), 3);
    }
}
