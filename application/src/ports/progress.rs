//! Progress notification port
//!
//! Defines the interface for reporting progress during an autonomous run.

use autopilot_domain::{AgentId, CouncilRound, DeadLetterEntry, SessionState, Task, TaskId};
use std::time::Duration;

/// Callback for progress updates during a run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, progress bars, etc.). Every method has
/// a no-op default so implementations pick the events they care about.
pub trait RunProgressNotifier: Send + Sync {
    /// Called after every session state change
    fn on_session_state(&self, _state: SessionState) {}

    /// Called when a phase starts
    fn on_phase_start(&self, _index: usize, _name: &str, _total_tasks: usize) {}

    /// Called when every task of a phase is resolved
    fn on_phase_complete(&self, _index: usize, _name: &str) {}

    fn on_task_started(&self, _task: &Task, _agent: &AgentId) {}

    fn on_task_completed(&self, _task: &Task) {}

    /// Called when an agent escalates or the sweeper stalls a task
    fn on_task_failed(&self, _task: &TaskId, _reason: &str) {}

    /// Called when a stalled task is scheduled for another attempt
    fn on_task_retry(&self, _task: &TaskId, _attempt: u32, _delay: Duration) {}

    /// Called for every dead-lettered task
    fn on_dead_letter(&self, _entry: &DeadLetterEntry) {}

    /// Called when a council round is finalized
    fn on_council_round(&self, _round: &CouncilRound) {}

    /// Called when a council round is discarded for missing votes
    fn on_council_quorum_missed(&self, _received: usize, _required: usize) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RunProgressNotifier for NoProgress {}
