//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`]: identifiers for sessions, tasks and agents
//! - [`error::DomainError`]: the orchestration error taxonomy
//! - [`text`]: small text helpers for reports and logs

pub mod error;
pub mod ids;
pub mod text;
