//! Completion council domain
//!
//! The council decides whether an autonomous run has converged. Every
//! scheduled check asks each member for a yes/no vote, tallies it against a
//! [`CouncilRule`], and, for unanimous yes votes, runs a devil's-advocate
//! second pass before the run may stop.
//!
//! ```text
//! votes ──► VoteTally ──decide()──► Continue
//!                                   Complete
//!                                   NeedsDevilsAdvocate ──apply_devils_advocate()──► Complete
//!                                                                                   Overturned
//!                                                                                   DevilsAdvocatePending
//! ```

pub mod convergence;
pub mod decision;
pub mod parsing;
pub mod prompt;
pub mod round;
pub mod rule;
pub mod state;
pub mod vote;

pub use convergence::{ConvergenceEntry, ConvergenceSignal, ConvergenceTracker, CouncilSchedule};
pub use decision::{
    DevilsAdvocateVerdict, RoundOutcome, TentativeDecision, apply_devils_advocate, decide,
};
pub use parsing::{parse_completion_vote, parse_devils_advocate};
pub use prompt::{CouncilBrief, CouncilPrompt};
pub use round::CouncilRound;
pub use rule::CouncilRule;
pub use state::CouncilState;
pub use vote::{Vote, VoteTally};
