//! Domain layer for autopilot
//!
//! This crate contains the entities, state machines and decision rules of an
//! autonomous multi-agent run. It has no dependencies on infrastructure or
//! presentation concerns and performs no I/O; every time-dependent operation
//! takes `now` explicitly.
//!
//! # Core Concepts
//!
//! - **Task queue**: tasks move `pending → queued → in_progress → completed`,
//!   detouring through `stalled → retrying` until the retry cap sends them to
//!   `dead_letter`.
//! - **Agents**: single-use workers bound to one task by identifier.
//! - **Completion council**: members vote on whether the run is done; 2/3 yes
//!   completes, a unanimous yes is challenged by a devil's advocate first.
//! - **Session**: drives the run through its SDLC phases.

pub mod agent;
pub mod core;
pub mod council;
pub mod providers;
pub mod retry;
pub mod session;
pub mod task;

// Re-export commonly used types
pub use agent::{Agent, AgentRole, AgentState, RarvStep, Verification};
pub use core::{
    error::DomainError,
    ids::{AgentId, SessionId, TaskId},
    text::excerpt,
};
pub use council::{
    ConvergenceEntry, ConvergenceSignal, ConvergenceTracker, CouncilBrief, CouncilPrompt,
    CouncilRound, CouncilRule, CouncilSchedule, CouncilState, DevilsAdvocateVerdict, RoundOutcome,
    Vote, VoteTally,
};
pub use providers::{Provider, ProviderCapabilities};
pub use retry::{BackoffPolicy, DEFAULT_MAX_RETRIES, DeadLetterEntry, RetryDecision, RetryPolicy};
pub use session::{
    Backlog, BacklogError, Session, SessionContext, SessionState, SessionStatus,
};
pub use task::{QueueStats, Task, TaskQueue, TaskState};
