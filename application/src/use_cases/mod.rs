//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod agent_controller;
pub mod completion_council;
pub mod queue_store;
pub mod retry_manager;
pub mod session_control;
pub mod session_runner;

#[cfg(test)]
pub(crate) mod test_support;
