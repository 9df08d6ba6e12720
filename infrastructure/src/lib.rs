//! Infrastructure layer for autopilot
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration loading, the state directory,
//! provider CLIs and workspace fingerprinting.

pub mod config;
pub mod logging;
pub mod providers;
pub mod state;
pub mod workspace;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigIssue, ConfigLoader, ConfigOverrides, FileConfig, Severity,
};
pub use logging::JsonlEventLogger;
pub use providers::{
    CliCouncilMember, CliDevilsAdvocate, CliError, CliTaskExecutor, ProviderCommand,
    council_members,
};
pub use state::{FileControlChannel, FileStateStore, PidRunnerLiveness, RunnerLock, StateLayout};
pub use workspace::GitWorkspaceProbe;
