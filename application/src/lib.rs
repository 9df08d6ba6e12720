//! Application layer for autopilot
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{CouncilParams, ExecutionParams, RunConfig};
pub use ports::{
    control::{
        AssumeRunnerAlive, ControlSignal, ControlSink, ControlSource, NoControl, RunnerLiveness,
    },
    council_member::{CouncilMember, DevilsAdvocate, MemberError},
    event_logger::{EventLogger, NoEventLogger, RunEvent},
    progress::{NoProgress, RunProgressNotifier},
    state_store::{ActiveTask, CouncilRepository, QueueRepository, SessionRepository, StoreError},
    task_executor::{ExecutionError, TaskExecutor},
    workspace_probe::{NoWorkspaceProbe, WorkspaceProbe},
};
pub use use_cases::agent_controller::{AgentController, WorkerOutcome, WorkerReport};
pub use use_cases::completion_council::{CompletionCouncil, CouncilError};
pub use use_cases::queue_store::{QueueError, TaskQueueStore};
pub use use_cases::retry_manager::{RetryManager, RetryOutcome};
pub use use_cases::session_control::{SessionControlUseCase, StopOutcome};
pub use use_cases::session_runner::{SessionError, SessionHandle, SessionRunner};
