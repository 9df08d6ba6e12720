//! Agent domain
//!
//! Agents are single-use workers: spawned for one task, terminated when that
//! task is reported or escalated. Each runs the [`rarv`] cycle.

pub mod entities;
pub mod rarv;

pub use entities::{Agent, AgentRole, AgentState};
pub use rarv::{RarvStep, Verification};
