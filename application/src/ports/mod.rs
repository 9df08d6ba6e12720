//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod control;
pub mod council_member;
pub mod event_logger;
pub mod progress;
pub mod state_store;
pub mod task_executor;
pub mod workspace_probe;
